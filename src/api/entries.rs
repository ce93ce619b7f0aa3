//! `GET /entries`: the avatar emoji catalog.

use actix_web::{web::Data, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::{api::AppContext, proto::Emoji};

/// Response of the catalog endpoint.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EntriesResponse {
    /// Every avatar emoji available to rooms, in catalog order.
    pub available: Vec<Emoji>,
}

/// Returns the avatar emoji catalog loaded at startup.
#[allow(clippy::unused_async)]
pub async fn list(state: Data<AppContext>) -> HttpResponse {
    HttpResponse::Ok().json(EntriesResponse {
        available: state
            .catalog
            .ids()
            .iter()
            .map(|id| Emoji { id: id.clone() })
            .collect(),
    })
}
