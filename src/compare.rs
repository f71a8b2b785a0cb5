use crate::exec::ExecutionResult;

/// Canonical form used for comparison: outer whitespace trimmed, CRLF
/// folded to LF. Output that is not UTF-8 gets the same treatment at the
/// byte level so no byte is ever lost to decoding.
pub fn normalize(raw: &[u8]) -> Vec<u8> {
    match std::str::from_utf8(raw) {
        Ok(text) => text.trim().replace("\r\n", "\n").into_bytes(),
        Err(_) => fold_crlf(raw.trim_ascii()),
    }
}

fn fold_crlf(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut iter = bytes.iter().peekable();
    while let Some(&b) = iter.next() {
        if b == b'\r' && iter.peek() == Some(&&b'\n') {
            continue;
        }
        out.push(b);
    }
    out
}

pub fn outputs_match(received: &[u8], expected: &[u8]) -> bool {
    normalize(received) == normalize(expected)
}

/// A run passes only with a zero exit status and matching output.
pub fn passed(result: &ExecutionResult, expected: &[u8]) -> bool {
    result.termination.is_success() && outputs_match(&result.stdout, expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::Termination;

    fn result(stdout: &[u8], termination: Termination) -> ExecutionResult {
        ExecutionResult {
            stdout: stdout.to_vec(),
            stderr: Vec::new(),
            termination,
        }
    }

    #[test]
    fn line_endings_and_outer_whitespace_are_ignored() {
        assert!(outputs_match(b"5\r\n", b"5\n"));
        assert!(outputs_match(b"  a\r\nb\r\n\r\n", b"a\nb"));
        assert!(outputs_match(b"\n\t x1 = 5 \n", b"x1 = 5"));
        assert!(outputs_match(b"", b"\n\n"));
    }

    #[test]
    fn inner_differences_still_fail() {
        assert!(!outputs_match(b"6", b"5\n"));
        assert!(!outputs_match(b"a  b", b"a b"));
        assert!(!outputs_match(b"a\n\nb", b"a\nb"));
        assert!(!outputs_match(b"a \nb", b"a\nb"));
        assert!(!outputs_match(b"A", b"a"));
    }

    #[test]
    fn normalize_trims_then_folds_crlf() {
        assert_eq!(normalize(b"\r\nx\r\ny\r\n"), b"x\ny");
        assert_eq!(normalize(b"x\r\r\ny"), b"x\r\ny");
        assert_eq!(normalize(b" \xff\r\n\xfe\r\n"), b"\xff\n\xfe");
    }

    #[test]
    fn nonzero_exit_fails_even_with_matching_output() {
        assert!(passed(&result(b"5\r\n", Termination::Exited(0)), b"5\n"));
        assert!(!passed(&result(b"5\n", Termination::Exited(1)), b"5\n"));
        assert!(!passed(&result(b"5\n", Termination::Signaled(6)), b"5\n"));
        assert!(!passed(
            &result(b"5\n", Termination::TimedOut(std::time::Duration::from_secs(1))),
            b"5\n"
        ));
    }

    #[test]
    fn invalid_utf8_is_compared_bytewise() {
        assert!(!outputs_match(b"\xff ok", b"\xfe ok"));
        assert!(outputs_match(b"\xff ok\r\n", b"\xff ok\n"));
        assert!(!outputs_match(b"\xff ok", b"ok"));
    }
}
