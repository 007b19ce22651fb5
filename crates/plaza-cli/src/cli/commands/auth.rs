//! Account and session command handlers.

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Context, Result};
use plaza_core::Plaza;
use plaza_core::http::ApiErrorKind;
use plaza_types::{Credentials, Registration};

/// Uses the given password, or reads one line from stdin.
pub fn password_or_stdin(password: Option<String>) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }

    let stdin = io::stdin();
    if stdin.is_terminal() {
        eprint!("Password: ");
        io::stderr().flush()?;
    }
    let mut line = String::new();
    stdin
        .lock()
        .read_line(&mut line)
        .context("read password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

pub async fn register(plaza: &Plaza, registration: &Registration) -> Result<()> {
    match plaza.session.register(registration).await {
        Ok(user) => {
            println!("Created account {} ({})", user.username, user.email);
            println!("Log in with: plaza login --email {}", user.email);
            Ok(())
        }
        Err(err) if err.kind == ApiErrorKind::Validation && !err.field_errors().is_empty() => {
            for (field, messages) in err.field_errors() {
                for message in messages {
                    eprintln!("  {field}: {message}");
                }
            }
            anyhow::bail!("Registration rejected; fix the fields above")
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn login(plaza: &mut Plaza, email: String, password: String) -> Result<()> {
    let user = plaza
        .session
        .login(&Credentials { email, password })
        .await?;
    println!("Logged in as {} ({})", user.display_name(), user.username);
    Ok(())
}

pub fn logout(plaza: &mut Plaza) {
    plaza.session.logout();
}

pub fn whoami(plaza: &Plaza) {
    match plaza.session.current_user() {
        Some(user) => println!("{} <{}>", user.username, user.email),
        None => println!("Not logged in"),
    }
}
