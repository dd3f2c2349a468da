// Text helpers shared by the heuristic extractors.

/// Number of lines in `content`, counting a trailing empty line.
pub fn line_count(content: &str) -> usize {
    content.split('\n').count()
}

/// 1-based line number of a byte offset.
pub fn line_of_offset(content: &str, offset: usize) -> usize {
    content[..offset].matches('\n').count() + 1
}

/// Estimate where a brace-delimited block starting on `start_line` ends.
///
/// Counts literal `{` and `}` per line, strings and comments included. The
/// block ends on the first line after `start_line` where the running depth
/// is zero, so a block that opens and closes on `start_line` ends on the
/// next line when there is one. A block with no such line ends on
/// `start_line`.
pub fn brace_block_end(lines: &[&str], start_line: usize) -> usize {
    let first = start_line.saturating_sub(1);
    let mut depth: i64 = 0;
    for (i, line) in lines.iter().enumerate().skip(first) {
        depth += count_char(line, '{');
        depth -= count_char(line, '}');
        if depth == 0 && i > first {
            return i + 1;
        }
    }
    start_line
}

#[allow(clippy::cast_possible_wrap)]
fn count_char(line: &str, c: char) -> i64 {
    line.matches(c).count() as i64
}

/// Resolve an import specifier against the importing module's path.
///
/// Relative specifiers (starting with `.`) are joined to the importer's
/// directory and `.`/`..` segments are folded textually. No symlinks,
/// aliases, index files or extensions are considered. Anything else is
/// returned unchanged.
pub fn resolve_import_path(specifier: &str, from_path: &str) -> String {
    if !specifier.starts_with('.') {
        return specifier.to_string();
    }

    let dir = from_path.rfind('/').map_or("", |i| &from_path[..i]);
    let mut segments: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();
    let absolute = from_path.starts_with('/');

    for part in specifier.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|s| *s != "..") {
                    segments.pop();
                } else {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    if absolute { format!("/{joined}") } else { joined }
}
