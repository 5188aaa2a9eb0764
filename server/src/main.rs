use actix_web::{web, App, HttpServer};
use clap::Parser;

use collab_paint_server::broker::spawn_broker;
use collab_paint_server::config::Opts;
use collab_paint_server::handlers::root;
use collab_paint_server::Accumulator;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let opts = Opts::parse();
    let broker_tx = spawn_broker();
    let accumulator = web::Data::new(Accumulator::new(
        opts.accumulator_config(),
        broker_tx.clone(),
    ));
    let broker_tx = web::Data::new(broker_tx);

    log::info!(
        "Listening on {} (polygon threshold {})",
        opts.bind,
        opts.polygon_threshold
    );
    HttpServer::new(move || {
        App::new()
            .app_data(broker_tx.clone())
            .app_data(accumulator.clone())
            .configure(root)
    })
    .bind(opts.bind)?
    .run()
    .await
}
