//! Connect to a device, run one command, and parse its output.
//!
//! ```sh
//! DEVICE_HOST=10.0.0.1 DEVICE_USER=admin DEVICE_PASS=switch \
//!     cargo run --example run_command
//! ```

use cmdchain::prelude::*;

#[tokio::main]
async fn main() -> cmdchain::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cmdchain=debug".into()),
        )
        .init();

    let profile = DeviceProfile::new(env("DEVICE_HOST"))
        .username(env("DEVICE_USER"))
        .password(env("DEVICE_PASS"));

    let mut session = CliSession::new(SshConnector::new(profile));
    let prompt = session.connect().await?;
    println!("discovered prompt: {prompt:?}");
    println!("session settings: {:?}", session.settings());

    let response = session.send_command("show chassis").await?;
    println!("--- raw output ({:?}) ---\n{}", response.elapsed, response.output);

    let records = parse_key_value_records(&response.output, None, Some(&prompt), "CHASSIS", ':');
    for (idx, record) in records.iter().enumerate() {
        println!("record {idx}:");
        for (key, value) in record {
            println!("  {key} = {value}");
        }
    }

    session.disconnect().await;
    Ok(())
}

fn env(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| panic!("{name} must be set"))
}
