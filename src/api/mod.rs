//! HTTP/WebSocket surface of the server.

pub mod entries;
pub mod ws;

use std::{io, sync::Arc};

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};

use crate::{
    catalog::Catalog, conf::Conf, prelude::*, signalling::RoomRepository,
};

/// Shared state of the [`actix_web`] server.
pub struct AppContext {
    /// Registry of active rooms.
    pub rooms: RoomRepository,

    /// Startup-loaded avatar emoji catalog.
    pub catalog: Arc<Catalog>,
}

/// Runs the HTTP/WebSocket server until it is stopped, then closes every
/// room that is still registered so their sockets drain.
///
/// # Errors
///
/// Errors if the configured address can't be bound.
pub async fn run(conf: &Conf, catalog: Arc<Catalog>) -> io::Result<()> {
    let rooms =
        RoomRepository::new(Arc::clone(&catalog), conf.room_idle_timeout);
    let registry = rooms.clone();

    info!("Listening on {}:{}", conf.host, conf.port);
    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .data(AppContext {
                rooms: rooms.clone(),
                catalog: Arc::clone(&catalog),
            })
            .wrap(middleware::Logger::default())
            .service(
                web::resource("/entries").route(web::get().to(entries::list)),
            )
            .service(
                web::resource("/connect").route(web::get().to(ws::create_ws)),
            )
    })
    .bind((conf.host, conf.port))?
    .run()
    .await?;

    registry.cleanup();
    Ok(())
}
