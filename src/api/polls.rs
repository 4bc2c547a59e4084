use chrono::Utc;
use rocket::{serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            poll::{PollDescription, PollResponseRequest, PollSpec, PollView},
            response::{RespondedStatus, ResponseDescription},
        },
        auth::{AuthToken, Privileged},
        common::{Resource, ResourceStatus},
        db::{NewResponse, Poll, PollChoice, Response},
        mongodb::{Coll, Id},
    },
};

use super::common::{
    close_resource, ensure_open, find_resource, has_responded, insert_resource, list_resources,
    poll_tally, record_response,
};

pub fn routes() -> Vec<Route> {
    routes![
        list_polls,
        get_poll,
        create_poll,
        close_poll,
        respond_to_poll,
        my_poll_response,
    ]
}

#[get("/polls?<status>")]
async fn list_polls(
    status: Option<ResourceStatus>,
    polls: Coll<Poll>,
) -> Result<Json<Vec<PollDescription>>> {
    let now = Utc::now();
    let polls = list_resources(&polls, status, now).await?;
    Ok(Json(
        polls
            .into_iter()
            .map(|poll| PollDescription::new(poll, now))
            .collect(),
    ))
}

#[get("/polls/<poll_id>")]
async fn get_poll(
    poll_id: Id,
    polls: Coll<Poll>,
    responses: Coll<Response<PollChoice>>,
) -> Result<Json<PollView>> {
    let poll = find_resource(&polls, poll_id).await?;
    let tally = poll_tally(&responses, &poll).await?;
    Ok(Json(PollView::new(poll, tally, Utc::now())))
}

#[post("/polls", data = "<spec>")]
async fn create_poll(
    token: Privileged,
    spec: Json<PollSpec>,
    polls: Coll<Poll>,
) -> Result<Json<PollDescription>> {
    let now = Utc::now();
    spec.validate(now).map_err(Error::Validation)?;
    let poll = Poll::new(spec.into_inner().into_poll(token.id, now));
    let poll = insert_resource(&polls, poll).await?;
    Ok(Json(PollDescription::new(poll, now)))
}

#[post("/polls/<poll_id>/close")]
async fn close_poll(
    _token: Privileged,
    poll_id: Id,
    polls: Coll<Poll>,
) -> Result<Json<PollDescription>> {
    let poll = close_resource(&polls, poll_id).await?;
    Ok(Json(PollDescription::new(poll, Utc::now())))
}

#[post("/polls/<poll_id>/responses", data = "<request>")]
async fn respond_to_poll(
    token: AuthToken,
    poll_id: Id,
    request: Json<PollResponseRequest>,
    polls: Coll<Poll>,
    responses: Coll<Response<PollChoice>>,
) -> Result<Json<ResponseDescription<PollChoice>>> {
    let now = Utc::now();
    let poll = find_resource(&polls, poll_id).await?;
    ensure_open(&poll, now)?;
    let choice = request.choice_for(&poll).map_err(Error::BadRequest)?;

    let response = Response::new(NewResponse::new(poll.id(), token.id, choice, now));
    let response = record_response::<Poll, _>(&responses, response).await?;
    Ok(Json(response.into()))
}

#[get("/polls/<poll_id>/responses/mine")]
async fn my_poll_response(
    token: AuthToken,
    poll_id: Id,
    polls: Coll<Poll>,
    responses: Coll<Response<PollChoice>>,
) -> Result<Json<RespondedStatus>> {
    let poll = find_resource(&polls, poll_id).await?;
    let responded = has_responded(&responses, poll.id(), token.id).await?;
    Ok(Json(RespondedStatus { responded }))
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration};
    use mongodb::{bson::doc, Database};
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::serde_json,
    };

    use crate::api::testing::{json, login, logout};
    use crate::error::{ErrorBody, ErrorDetail};
    use crate::model::{auth::Role, common::ResourceMetadata, db::PollCore};

    use super::*;

    fn spec(title: &str) -> PollSpec {
        PollSpec {
            title: title.to_string(),
            description: "Have your say".to_string(),
            options: vec!["A".to_string(), "B".to_string()],
            end_date: None,
        }
    }

    async fn insert_poll(polls: &Coll<Poll>, title: &str, end_date: Option<DateTime<Utc>>) -> Poll {
        let now = Utc::now();
        let poll = Poll::new(PollCore {
            metadata: ResourceMetadata::new(
                title.to_string(),
                String::new(),
                Id::new(),
                end_date,
                now - Duration::days(1),
            ),
            options: vec!["A".to_string(), "B".to_string()],
        });
        polls.insert_one(&poll, None).await.unwrap();
        poll
    }

    async fn create(client: &Client, spec: &PollSpec) -> PollDescription {
        let response = client
            .post(uri!(create_poll))
            .header(ContentType::JSON)
            .body(serde_json::to_string(spec).unwrap())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        json(response).await
    }

    async fn respond(client: &Client, poll_id: Id, body: &str) -> (Status, String) {
        let response = client
            .post(uri!(respond_to_poll(poll_id)))
            .header(ContentType::JSON)
            .body(body)
            .dispatch()
            .await;
        (response.status(), response.into_string().await.unwrap())
    }

    fn error_message(body: &str) -> String {
        match serde_json::from_str::<ErrorBody>(body).unwrap().error {
            ErrorDetail::Message(msg) => msg,
            other => panic!("expected a message, got {other:?}"),
        }
    }

    #[backend_test(moderator)]
    async fn create_and_view(client: Client) {
        let created = create(&client, &spec("Canteen opening hours")).await;
        assert_eq!(created.status, ResourceStatus::Active);
        assert_eq!(created.options, vec!["A", "B"]);

        let response = client
            .get(uri!(get_poll(*created.id)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let view: PollView = json(response).await;
        assert_eq!(view.resource.id, created.id);
        assert_eq!(view.resource.title, "Canteen opening hours");
        assert_eq!(view.tally, vec![0, 0]);
        assert_eq!(view.total, 0);
    }

    #[backend_test]
    async fn tally_counts_every_response(
        client: Client,
        polls: Coll<Poll>,
        responses: Coll<Response<PollChoice>>,
    ) {
        let poll = insert_poll(&polls, "Library hours", None).await;
        for choice in [0, 1, 1] {
            let response = Response::new(NewResponse::new(
                poll.id,
                Id::new(),
                PollChoice(choice),
                Utc::now(),
            ));
            responses.insert_one(&response, None).await.unwrap();
        }

        let view: PollView = json(client.get(uri!(get_poll(poll.id))).dispatch().await).await;
        assert_eq!(view.tally, vec![1, 2]);
        assert_eq!(view.total, 3);
        assert_eq!(view.tally.iter().sum::<u64>(), view.total);
    }

    #[backend_test]
    async fn second_response_is_rejected(
        client: Client,
        db: Database,
        responses: Coll<Response<PollChoice>>,
    ) {
        login(&client, &db, Role::Moderator).await;
        let poll = create(&client, &spec("Sports day date")).await;
        let poll_id = *poll.id;
        logout(&client).await;
        let student = login(&client, &db, Role::Student).await;

        let mine: RespondedStatus =
            json(client.get(uri!(my_poll_response(poll_id))).dispatch().await).await;
        assert!(!mine.responded);

        let (status, body) = respond(&client, poll_id, r#"{"choice": 1}"#).await;
        assert_eq!(Status::Ok, status);
        let recorded: ResponseDescription<PollChoice> = serde_json::from_str(&body).unwrap();
        assert_eq!(recorded.choice, PollChoice(1));
        assert_eq!(*recorded.user_id, student.id);

        let (status, body) = respond(&client, poll_id, r#"{"choice": 0}"#).await;
        assert_eq!(Status::BadRequest, status);
        assert!(error_message(&body).contains("already"));

        let stored = responses
            .count_documents(doc! { "resource_id": poll_id, "user_id": student.id }, None)
            .await
            .unwrap();
        assert_eq!(stored, 1);

        let mine: RespondedStatus =
            json(client.get(uri!(my_poll_response(poll_id))).dispatch().await).await;
        assert!(mine.responded);
    }

    #[backend_test]
    async fn responding_requires_a_session(client: Client, polls: Coll<Poll>) {
        let poll = insert_poll(&polls, "Bus timetable", None).await;
        for body in [r#"{"choice": 0}"#, r#"{"choice": 99}"#, "not json"] {
            let (status, _) = respond(&client, poll.id, body).await;
            assert_eq!(Status::Unauthorized, status);
        }

        // No content type at all still reaches the session check.
        let response = client
            .post(uri!(respond_to_poll(poll.id)))
            .body(r#"{"choice": 0}"#)
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
    }

    #[backend_test(student)]
    async fn out_of_range_choices_are_rejected(
        client: Client,
        polls: Coll<Poll>,
        responses: Coll<Response<PollChoice>>,
    ) {
        let poll = insert_poll(&polls, "Exam timetable", None).await;
        for body in [r#"{"choice": 2}"#, r#"{"choice": -1}"#, "{}"] {
            let (status, _) = respond(&client, poll.id, body).await;
            assert_eq!(Status::BadRequest, status);
        }
        assert_eq!(responses.count_documents(None, None).await.unwrap(), 0);
    }

    #[backend_test(student)]
    async fn non_integer_choices_are_rejected(
        client: Client,
        polls: Coll<Poll>,
        responses: Coll<Response<PollChoice>>,
    ) {
        let poll = insert_poll(&polls, "Graduation venue", None).await;
        for body in [
            r#"{"choice": 99999999999999999999}"#,
            r#"{"choice": 1.5}"#,
            r#"{"choice": "1"}"#,
        ] {
            let (status, body) = respond(&client, poll.id, body).await;
            assert_eq!(Status::BadRequest, status);
            assert!(error_message(&body).contains("not an option"));
        }
        assert_eq!(responses.count_documents(None, None).await.unwrap(), 0);
    }

    #[backend_test(student)]
    async fn expired_poll_is_closed(client: Client, polls: Coll<Poll>) {
        let poll = insert_poll(
            &polls,
            "Last term's survey",
            Some(Utc::now() - Duration::hours(1)),
        )
        .await;
        let (status, body) = respond(&client, poll.id, r#"{"choice": 0}"#).await;
        assert_eq!(Status::BadRequest, status);
        assert!(error_message(&body).contains("closed"));

        let view: PollView = json(client.get(uri!(get_poll(poll.id))).dispatch().await).await;
        assert_eq!(view.resource.status, ResourceStatus::Closed);
    }

    #[backend_test(moderator)]
    async fn close_poll_stops_responses(client: Client) {
        let poll = create(&client, &spec("Society funding")).await;
        let poll_id = *poll.id;

        let response = client.post(uri!(close_poll(poll_id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let closed: PollDescription = json(response).await;
        assert_eq!(closed.status, ResourceStatus::Closed);

        let response = client.post(uri!(close_poll(poll_id))).dispatch().await;
        assert_eq!(Status::BadRequest, response.status());

        let (status, _) = respond(&client, poll_id, r#"{"choice": 0}"#).await;
        assert_eq!(Status::BadRequest, status);

        let response = client.post(uri!(close_poll(Id::new()))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(student)]
    async fn students_cannot_create_polls(client: Client, polls: Coll<Poll>) {
        for body in [serde_json::to_string(&spec("Valid poll title")).unwrap(), "garbage".to_string()] {
            let response = client
                .post(uri!(create_poll))
                .header(ContentType::JSON)
                .body(body)
                .dispatch()
                .await;
            assert_eq!(Status::Forbidden, response.status());
        }
        let poll = insert_poll(&polls, "Someone else's poll", None).await;
        let response = client.post(uri!(close_poll(poll.id))).dispatch().await;
        assert_eq!(Status::Forbidden, response.status());
    }

    #[backend_test(admin)]
    async fn invalid_specs_are_rejected(client: Client, polls: Coll<Poll>) {
        let response = client
            .post(uri!(create_poll))
            .header(ContentType::JSON)
            .body(serde_json::to_string(&spec("Hi")).unwrap())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
        let body: ErrorBody = json(response).await;
        match body.error {
            ErrorDetail::Violations(violations) => {
                assert!(violations.iter().any(|v| v.field == "title"));
            }
            other => panic!("expected violations, got {other:?}"),
        }
        assert_eq!(polls.count_documents(None, None).await.unwrap(), 0);
    }

    #[backend_test(moderator)]
    async fn titles_are_unique(client: Client) {
        create(&client, &spec("Graduation venue")).await;
        let response = client
            .post(uri!(create_poll))
            .header(ContentType::JSON)
            .body(serde_json::to_string(&spec("Graduation venue")).unwrap())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
        let body: ErrorBody = json(response).await;
        assert_eq!(
            body.error,
            ErrorDetail::Message("A poll titled \"Graduation venue\" already exists".to_string())
        );
    }

    #[backend_test(moderator)]
    async fn listing_filters_by_status(client: Client) {
        let first = create(&client, &spec("First poll title")).await;
        let second = create(&client, &spec("Second poll title")).await;
        client
            .post(uri!(close_poll(*first.id)))
            .dispatch()
            .await;

        let all: Vec<PollDescription> = json(client.get("/polls").dispatch().await).await;
        let titles: Vec<_> = all.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Second poll title", "First poll title"]);

        let active: Vec<PollDescription> =
            json(client.get("/polls?status=active").dispatch().await).await;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, second.id);

        let closed: Vec<PollDescription> =
            json(client.get("/polls?status=closed").dispatch().await).await;
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].id, first.id);
    }

    #[backend_test]
    async fn unknown_poll_is_not_found(client: Client) {
        let response = client.get(uri!(get_poll(Id::new()))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }
}
