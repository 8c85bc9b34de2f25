//! Interactive multi-line SQL input.

use std::io::{self, BufRead};

/// Line that ends interactive input.
pub const END_MARKER: &str = "END";

/// Reads SQL until a line holding only [`END_MARKER`], two consecutive blank
/// lines, or end of input. The result is trimmed.
///
/// # Errors
///
/// Returns any error of the underlying reader.
pub fn read_multiline<R: BufRead>(reader: R) -> io::Result<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut blank_run = 0;

    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed == END_MARKER {
            break;
        }
        if trimmed.is_empty() {
            blank_run += 1;
            if blank_run >= 2 {
                lines.pop();
                break;
            }
        } else {
            blank_run = 0;
        }
        lines.push(line);
    }

    Ok(lines.join("\n").trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(text: &str) -> String {
        read_multiline(text.as_bytes()).unwrap()
    }

    #[test]
    fn test_end_marker_stops_input() {
        let sql = read("CREATE TABLE t (\n  id INT\n);\n  END  \nignored\n");
        assert_eq!(sql, "CREATE TABLE t (\n  id INT\n);");
    }

    #[test]
    fn test_two_blank_lines_stop_input() {
        let sql = read("CREATE TABLE a (id INT);\n\nCREATE TABLE b (id INT);\n\n\nignored\n");
        assert_eq!(sql, "CREATE TABLE a (id INT);\n\nCREATE TABLE b (id INT);");
    }

    #[test]
    fn test_eof_ends_input() {
        assert_eq!(read("  CREATE TABLE t (id INT)"), "CREATE TABLE t (id INT)");
        assert_eq!(read(""), "");
    }

    #[test]
    fn test_end_must_be_alone_on_its_line() {
        let sql = read("CREATE TABLE t (id INT) -- END\nEND\n");
        assert_eq!(sql, "CREATE TABLE t (id INT) -- END");
    }
}
