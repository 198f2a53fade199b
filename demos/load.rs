use serde::Deserialize;
use tracing_subscriber::EnvFilter;
use wafl::{Config, Env};

#[derive(Debug, Deserialize)]
struct AppConfig {
    app: AppSection,
    list: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct AppSection {
    name: String,
    version: i64,
    debug: bool,
    colors: Colors,
}

#[derive(Debug, Deserialize)]
struct Colors {
    primary: String,
}

fn main() -> Result<(), wafl::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let env = Env::from_process().with("SHOW_EXTRA", true);

    // Untyped: the resolved tree plus loader metadata
    let loaded = Config::builder()
        .with_file("demos/base.wafl")
        .with_env(env.clone())
        .with_symbol("region", "eu-west")
        .load()?;
    println!(
        "{}",
        serde_json::to_string_pretty(&loaded.config).unwrap_or_default()
    );
    println!("imports: {:?}", loaded.meta.imports);

    // Typed: deserialize once at build time
    let config: AppConfig = Config::builder()
        .with_file("demos/base.wafl")
        .with_env(env)
        .with_symbol("region", "eu-west")
        .build()?;
    println!(
        "App: {} v{} ({})",
        config.app.name, config.app.version, config.app.colors.primary
    );
    println!("List: {}", config.list.join(", "));

    Ok(())
}
