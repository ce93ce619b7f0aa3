use std::sync::Arc;

use clap::{
    app_from_crate, crate_authors, crate_description, crate_name,
    crate_version, Arg,
};

use theatre::{api, catalog::Catalog, conf::Conf, prelude::*};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let opts = app_from_crate!()
        .arg(
            Arg::with_name("host")
                .help("Host to run the server on")
                .long("host")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("port")
                .help("Port to run the server on")
                .long("port")
                .short("p")
                .takes_value(true),
        )
        .get_matches();

    let _log_guard = theatre::init_logger();

    let mut conf = Conf::parse()?;
    if let Some(host) = opts.value_of("host") {
        conf.host = host.parse()?;
    }
    if let Some(port) = opts.value_of("port") {
        conf.port = port.parse()?;
    }

    let catalog = Arc::new(Catalog::load(&conf.entries_file)?);
    info!(
        "Loaded {} avatar emoji from {}",
        catalog.len(),
        conf.entries_file,
    );

    api::run(&conf, catalog).await?;
    Ok(())
}
