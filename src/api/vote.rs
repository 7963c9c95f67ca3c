use log::info;
use rocket::{
    post, routes,
    serde::json::{Error as JsonError, Json},
    Route, State,
};

use crate::error::{Error, Result};
use crate::logging::RequestId;
use crate::model::api::{identity::Identity, question::QuestionDesc, vote::VoteRequest};
use crate::service::VotingService;

pub fn routes() -> Vec<Route> {
    routes![submit_vote]
}

#[post("/vote", data = "<request>")]
async fn submit_vote(
    id: &RequestId,
    request: std::result::Result<Json<VoteRequest>, JsonError<'_>>,
    identity: Identity,
    voting: &State<VotingService>,
) -> Result<Json<QuestionDesc>> {
    let request = request
        .map_err(|e| Error::BadRequest(e.to_string()))?
        .into_inner();

    let question = voting
        .cast_vote(&request.question_id, &request.option, &identity)
        .await?;
    info!(
        "req{id} counted vote {} on question {}",
        request.option, question.id
    );
    Ok(Json(question.into()))
}
