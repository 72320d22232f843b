use anyhow::{Result, bail};
use std::io::{self, BufRead, IsTerminal};
use zeroize::Zeroizing;

/// Reads the vault password.
///
/// Sources, in order: `SECUREVAULT_PASSWORD`, the first line of piped stdin
/// (only when `stdin_free` is true, i.e. stdin is not carrying the payload),
/// then an interactive prompt.
pub fn read_password(stdin_free: bool) -> Result<Zeroizing<String>> {
    //  SECUREVAULT_PASSWORD="supersecret" securevault encrypt "data"
    if let Ok(pw) = std::env::var("SECUREVAULT_PASSWORD") {
        let pw = Zeroizing::new(pw);
        if !pw.is_empty() {
            return Ok(pw);
        }
    }

    //  echo "supersecret" | securevault decrypt "$TOKEN"
    if stdin_free && !io::stdin().is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().lock().read_line(&mut buf)?;
        trim_newline(&mut buf);

        if !buf.is_empty() {
            return Ok(buf);
        }
    }

    if io::stdin().is_terminal() {
        let pw = Zeroizing::new(rpassword::prompt_password("Password: ")?);
        if !pw.is_empty() {
            return Ok(pw);
        }
    }

    bail!("No password provided")
}

fn trim_newline(s: &mut String) {
    while s.ends_with('\n') || s.ends_with('\r') {
        s.pop();
    }
}
