use log::info;
use rocket::{
    get, post, routes,
    serde::json::{Error as JsonError, Json},
    Route, State,
};

use crate::error::{Error, Result};
use crate::logging::RequestId;
use crate::model::api::{
    identity::Identity,
    question::{QuestionDesc, QuestionSpec},
};
use crate::service::QueryService;

pub fn routes() -> Vec<Route> {
    routes![get_questions, create_question]
}

#[get("/questions")]
async fn get_questions(
    identity: Identity,
    queries: &State<QueryService>,
) -> Result<Json<Vec<QuestionDesc>>> {
    let questions = queries
        .unanswered_questions(&identity)
        .await?
        .into_iter()
        .map(QuestionDesc::from)
        .collect();
    Ok(Json(questions))
}

#[post("/questions", data = "<spec>")]
async fn create_question(
    id: &RequestId,
    spec: std::result::Result<Json<QuestionSpec>, JsonError<'_>>,
    queries: &State<QueryService>,
) -> Result<Json<QuestionDesc>> {
    let spec = spec.map_err(|e| Error::BadRequest(e.to_string()))?;
    let question = queries.submit_question(spec.into_inner()).await?;
    info!("req{id} created question {}", question.id);
    Ok(Json(question.into()))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Header, Status},
        local::asynchronous::Client,
        serde::json::{json, serde_json},
        uri,
    };

    use crate::cors::{ALLOWED_HEADERS, ALLOWED_METHODS};
    use crate::model::api::identity::SESSION_COOKIE;
    use crate::service::QUESTION_BATCH_SIZE;
    use crate::store::Stores;
    use crate::TEST_FRONTEND_ORIGIN;

    use super::*;

    async fn fetch_questions(client: &Client) -> Vec<QuestionDesc> {
        let response = client.get(uri!(get_questions)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let raw_response = response.into_string().await.unwrap();
        serde_json::from_str(&raw_response).unwrap()
    }

    #[backend_test]
    async fn create_question_zeroes_tallies(client: Client, stores: Stores) {
        let response = client
            .post(uri!(create_question))
            .header(ContentType::JSON)
            .body(
                json!({
                    "id": "client-chosen",
                    "question": "Would you rather...",
                    "optionA": "Tea",
                    "optionB": "Coffee",
                    "votesA": 99,
                })
                .to_string(),
            )
            .dispatch()
            .await;

        assert_eq!(Status::Ok, response.status());
        let raw_response = response.into_string().await.unwrap();
        let created = serde_json::from_str::<QuestionDesc>(&raw_response).unwrap();

        assert_ne!(created.id.as_str(), "client-chosen");
        assert_eq!(created.option_a, "Tea");
        assert_eq!(created.option_b, "Coffee");
        assert_eq!((created.votes_a, created.votes_b), (0, 0));

        let stored = stores.questions.get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(QuestionDesc::from(stored), created);
    }

    #[backend_test]
    async fn create_question_rejects_bad_bodies(client: Client) {
        let bodies = [
            "not json".to_string(),
            json!({"question": "Missing options"}).to_string(),
            json!({"question": "Q", "optionA": "", "optionB": "B"}).to_string(),
        ];
        for body in bodies {
            let response = client
                .post(uri!(create_question))
                .header(ContentType::JSON)
                .body(body)
                .dispatch()
                .await;
            assert_eq!(Status::BadRequest, response.status());
        }

        assert!(fetch_questions(&client).await.is_empty());
    }

    #[backend_test]
    async fn create_question_ignores_content_type(client: Client) {
        let response = client
            .post(uri!(create_question))
            .header(ContentType::Plain)
            .body("garbage")
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        let response = client
            .post(uri!(create_question))
            .body(json!(QuestionSpec::example()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(fetch_questions(&client).await.len(), 1);
    }

    #[backend_test]
    async fn get_questions_issues_session_cookie(client: Client, stores: Stores) {
        for n in 0..(QUESTION_BATCH_SIZE + 5) {
            stores.questions.insert(QuestionSpec::numbered(n)).await.unwrap();
        }
        assert!(client.cookies().get(SESSION_COOKIE).is_none());

        let questions = fetch_questions(&client).await;
        assert_eq!(questions.len(), QUESTION_BATCH_SIZE);

        let cookie = client.cookies().get(SESSION_COOKIE).cloned().unwrap();
        assert!(!cookie.value().is_empty());

        // The same session is kept on later requests.
        fetch_questions(&client).await;
        let again = client.cookies().get(SESSION_COOKIE).cloned().unwrap();
        assert_eq!(cookie.value(), again.value());
    }

    #[backend_test]
    async fn cors_headers_for_frontend_origin(client: Client) {
        let response = client
            .get(uri!(get_questions))
            .header(Header::new("Origin", TEST_FRONTEND_ORIGIN))
            .dispatch()
            .await;
        assert_eq!(
            response.headers().get_one("Access-Control-Allow-Origin"),
            Some(TEST_FRONTEND_ORIGIN)
        );
        assert_eq!(
            response.headers().get_one("Access-Control-Allow-Credentials"),
            Some("true")
        );

        let preflight = client
            .options("/vote")
            .header(Header::new("Origin", TEST_FRONTEND_ORIGIN))
            .dispatch()
            .await;
        assert_eq!(Status::NoContent, preflight.status());
        assert_eq!(
            preflight.headers().get_one("Access-Control-Allow-Methods"),
            Some(ALLOWED_METHODS)
        );
        assert_eq!(
            preflight.headers().get_one("Access-Control-Allow-Headers"),
            Some(ALLOWED_HEADERS)
        );

        let foreign = client
            .get(uri!(get_questions))
            .header(Header::new("Origin", "https://elsewhere.example"))
            .dispatch()
            .await;
        assert!(foreign
            .headers()
            .get_one("Access-Control-Allow-Origin")
            .is_none());
    }
}
