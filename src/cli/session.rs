//! Session commands: login, logout, whoami.

use crate::config::DeploymentMode;
use crate::identity::Session;

pub(super) fn cmd_login(session: &dyn Session, email: &str, code: Option<&str>) -> Result<(), String> {
    let email = email.trim();
    if email.is_empty() {
        return Err("email cannot be empty".to_string());
    }

    match code {
        None => {
            session
                .send_login_code(email)
                .map_err(|e| format!("failed to send login code: {e}"))?;
            eprintln!("Code sent to {email}");
            eprintln!("Finish with: kefir login {email} --code <code>");
        }
        Some(code) => {
            let user = session
                .verify_login_code(email, code)
                .map_err(|e| format!("login failed: {e}"))?;
            eprintln!("Signed in as {}", user.email);
        }
    }
    Ok(())
}

pub(super) fn cmd_logout(session: &dyn Session) -> Result<(), String> {
    session
        .sign_out()
        .map_err(|e| format!("failed to sign out: {e}"))?;
    eprintln!("Signed out");
    Ok(())
}

pub(super) fn cmd_whoami(session: &dyn Session, mode: &DeploymentMode) -> Result<(), String> {
    let user = session
        .current_user()
        .map_err(|e| format!("failed to read session: {e}"))?;

    match user {
        Some(user) if user.email.is_empty() => println!("{}", user.id),
        Some(user) => println!("{} <{}>", user.id, user.email),
        None => println!("Not signed in"),
    }
    match mode {
        DeploymentMode::Demo { root } => eprintln!("Demo mode (data in {})", root.display()),
        DeploymentMode::Relational { database } => {
            eprintln!("Database: {}", database.display());
        }
    }
    Ok(())
}
