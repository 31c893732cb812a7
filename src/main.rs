use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use sqlx::postgres::PgPoolOptions;

mod downline;
mod models;
mod repositories;
pub mod services;
pub mod settings;

fn init_logging() {
    let stdout = ConsoleAppender::builder().build();
    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(log::LevelFilter::Info))
        .expect("Could not build logging config.");

    log4rs::init_config(config).expect("Could not initialize logging.");
}

#[tokio::main]
async fn main() {
    init_logging();

    let config = settings::Settings::new().expect("Could not load config file.");
    let conn = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.postgres.url)
        .await
        .expect("Could not connect to database.");

    log::info!("Starting services.");
    services::start_services(conn, config)
        .await
        .expect("Could not start services.");
}
