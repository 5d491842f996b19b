#[macro_use]
extern crate rocket;
#[macro_use]
extern crate log;

use rocket::http::Status;
use rocket::serde::json::Json;
use rocket_okapi::{openapi, openapi_get_routes, swagger_ui::*};
use std::env;

mod battlesnake;

/// # Get info
///
/// Returns Battlesnake info
#[openapi(tag = "Battlesnake")]
#[get("/")]
fn index() -> Json<battlesnake::Info> {
    info!("INDEX");
    Json(battlesnake::info())
}

#[post("/start", format = "json", data = "<game_state>")]
fn start(game_state: Json<battlesnake::GameState>) -> Status {
    battlesnake::start(game_state.into_inner());
    Status::Ok
}

#[post("/move", format = "json", data = "<game_state>")]
fn game_move(game_state: Json<battlesnake::GameState>) -> Json<battlesnake::MoveResponse> {
    Json(battlesnake::make_move(game_state.into_inner()))
}

#[post("/end", format = "json", data = "<game_state>")]
fn end(game_state: Json<battlesnake::GameState>) -> Status {
    battlesnake::end(game_state.into_inner());
    Status::Ok
}

#[launch]
fn launch() -> _ {
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    env_logger::init();
    info!("LAUNCH");
    rocket::build()
        .mount("/", openapi_get_routes![index])
        .mount("/", routes![start, game_move, end])
        .mount(
            "/docs",
            make_swagger_ui(&SwaggerUIConfig {
                url: "../openapi.json".to_owned(),
                ..Default::default()
            }),
        )
}
