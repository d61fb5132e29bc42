//! The yes/no gate in front of every write.
use std::io::{self, BufRead, Write};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Confirmation {
    Granted,
    /// The user answered "no".
    Denied,
    /// Two answers that were neither "yes" nor "no".
    NotGranted,
}

impl Confirmation {
    /// Process exit status for an aborted run.
    pub fn exit_code(self) -> Option<u8> {
        match self {
            Confirmation::Granted => None,
            Confirmation::Denied => Some(0),
            Confirmation::NotGranted => Some(2),
        }
    }
}

/// Asks once, re-asks once on an invalid answer.  Only the literal strings
/// `yes` and `no` count; end of input is an invalid answer.
pub fn confirm(mut input: impl BufRead, mut output: impl Write) -> io::Result<Confirmation> {
    let mut prompt = "Please Confirm (yes or no): ";
    for _ in 0..2 {
        write!(output, "{prompt}")?;
        output.flush()?;
        let mut line = String::new();
        input.read_line(&mut line)?;
        match line.trim_end_matches(['\r', '\n']) {
            "yes" => return Ok(Confirmation::Granted),
            "no" => {
                writeln!(output, "Abort, user permission denied")?;
                return Ok(Confirmation::Denied);
            }
            _ => prompt = "Please enter 'yes' or 'no': ",
        }
    }
    writeln!(output, "Abort, user permission not granted")?;
    Ok(Confirmation::NotGranted)
}

#[cfg(test)]
mod tests {
    use super::{confirm, Confirmation};

    fn run(input: &str) -> (Confirmation, String) {
        let mut output = vec![];
        let res = confirm(input.as_bytes(), &mut output).unwrap();
        (res, String::from_utf8(output).unwrap())
    }

    #[test]
    fn yes_and_no() {
        assert_eq!(run("yes\n").0, Confirmation::Granted);
        let (res, output) = run("no\n");
        assert_eq!(res, Confirmation::Denied);
        assert!(output.ends_with("Abort, user permission denied\n"));
        assert_eq!(res.exit_code(), Some(0));
    }

    #[test]
    fn one_retry_only() {
        let (res, output) = run("y\nyes\n");
        assert_eq!(res, Confirmation::Granted);
        assert!(output.contains("Please enter 'yes' or 'no': "));

        let (res, output) = run("YES\nnope\nyes\n");
        assert_eq!(res, Confirmation::NotGranted);
        assert!(output.ends_with("Abort, user permission not granted\n"));
        assert_eq!(res.exit_code(), Some(2));

        assert_eq!(run("").0, Confirmation::NotGranted);
    }
}
