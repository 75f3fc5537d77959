//! JSON decoding for provider responses with path-aware error messages.

/// Parse JSON and, on failure, describe where in the document it broke.
///
/// The message includes the serde path, the type mismatch, and a short
/// snippet around the failing column.
pub fn parse_json_with_context<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, String> {
    let jd = &mut serde_json::Deserializer::from_str(body);
    match serde_path_to_error::deserialize(jd) {
        Ok(value) => Ok(value),
        Err(err) => {
            let inner_err = err.inner();
            let (line, column) = (inner_err.line(), inner_err.column());
            let path = err.path().to_string();

            let msg = inner_err.to_string();
            let loc = format!(" at line {line} column {column}");
            let msg_without_loc = msg.strip_suffix(&loc).unwrap_or(&msg).to_string();

            let mut out = String::new();
            if !path.is_empty() && path != "." {
                out.push_str(&format!("at path '{path}': "));
            }
            out.push_str(&format!(
                "{} (line {line} col {column})\n{}",
                describe_mismatch(&msg_without_loc),
                build_error_snippet(body, line, column, 20)
            ));
            Err(out)
        }
    }
}

/// Rewrite "invalid type: X, expected Y" as "expected Y, got X".
fn describe_mismatch(error_msg: &str) -> String {
    if let Some(rest) = error_msg.strip_prefix("invalid type: ")
        && let Some((actual, expected)) = rest.split_once(", expected ")
    {
        return format!("expected {}, got {actual}", expected.trim());
    }
    error_msg.to_string()
}

fn build_error_snippet(body: &str, line: usize, column: usize, context_len: usize) -> String {
    let target_line = body.lines().nth(line.saturating_sub(1)).unwrap_or("");
    if target_line.is_empty() {
        return "(empty line)".to_string();
    }

    let error_idx = column.saturating_sub(1).min(target_line.len());
    let half_len = context_len / 2;
    let mut start = error_idx.saturating_sub(half_len);
    let mut end = (error_idx + half_len).min(target_line.len());
    while !target_line.is_char_boundary(start) {
        start -= 1;
    }
    while !target_line.is_char_boundary(end) {
        end += 1;
    }

    let indicator = " ".repeat(error_idx - start) + "^";
    format!("...{}...\n   {indicator}", &target_line[start..end])
}
