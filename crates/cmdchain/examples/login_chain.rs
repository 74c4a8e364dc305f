//! Drive a full login exchange as one chain, retrying on auth failure.
//!
//! The chain wakes the terminal, reads whatever prompt appears, and branches:
//! login prompt, password prompt, or an already-open session each take a
//! different path, with no hand-written state machine.
//!
//! ```sh
//! DEVICE_HOST=10.0.0.1 DEVICE_USER=admin DEVICE_PASS=switch \
//!     cargo run --example login_chain
//! ```

use std::time::Duration;

use cmdchain::prelude::*;

#[tokio::main]
async fn main() -> cmdchain::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cmdchain=debug".into()),
        )
        .init();

    let user = std::env::var("DEVICE_USER").unwrap_or_else(|_| "admin".into());
    let pass = std::env::var("DEVICE_PASS").unwrap_or_else(|_| "switch".into());
    let host = std::env::var("DEVICE_HOST").expect("DEVICE_HOST must be set");

    let profile = DeviceProfile::new(host)
        .username(user.clone())
        .password(pass.clone());
    let mut session = CliSession::new(SshConnector::new(profile));
    session.connect().await?;

    let mut builder = ChainBuilder::new();
    let send_password = builder.branch(|b| {
        b.send(pass.clone())
            .wait(Duration::from_millis(1000))
            .regex(".+");
    });
    let send_login = builder.branch(|b| {
        b.send(user.clone())
            .regex(".*[Pp]assword:.*")
            .custom(move |_, _| Decision::Goto(send_password));
    });
    builder.enter().regex(".+").custom(move |_, text| {
        let seen = text.trim();
        if seen.ends_with("login:") {
            Decision::Goto(send_login)
        } else if seen.ends_with("assword:") {
            Decision::Goto(send_password)
        } else {
            // Session is already open.
            Decision::Finish
        }
    });
    let chain = builder.build();

    let executor = ChainExecutor::new();
    let outcome = executor
        .execute(
            &mut session,
            &chain,
            ResultCallback::new(
                |data| println!("login exchange complete:\n{data}"),
                |error| eprintln!("login exchange failed: {error}"),
            ),
        )
        .await;

    session.disconnect().await;
    std::process::exit(i32::from(!outcome.is_success()));
}
