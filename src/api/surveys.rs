use chrono::Utc;
use rocket::{serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            response::{RespondedStatus, ResponseDescription},
            survey::{SurveyDescription, SurveyResponseRequest, SurveySpec, SurveyView},
        },
        auth::{AuthToken, Privileged},
        common::{Resource, ResourceStatus},
        db::{NewResponse, Response, Survey, SurveyAnswers},
        mongodb::{Coll, Id},
    },
};

use super::common::{
    close_resource, ensure_open, find_resource, has_responded, insert_resource, list_resources,
    record_response, survey_tally,
};

pub fn routes() -> Vec<Route> {
    routes![
        list_surveys,
        get_survey,
        create_survey,
        close_survey,
        respond_to_survey,
        my_survey_response,
    ]
}

#[get("/surveys?<status>")]
async fn list_surveys(
    status: Option<ResourceStatus>,
    surveys: Coll<Survey>,
) -> Result<Json<Vec<SurveyDescription>>> {
    let now = Utc::now();
    let surveys = list_resources(&surveys, status, now).await?;
    Ok(Json(
        surveys
            .into_iter()
            .map(|survey| SurveyDescription::new(survey, now))
            .collect(),
    ))
}

#[get("/surveys/<survey_id>")]
async fn get_survey(
    survey_id: Id,
    surveys: Coll<Survey>,
    responses: Coll<Response<SurveyAnswers>>,
) -> Result<Json<SurveyView>> {
    let survey = find_resource(&surveys, survey_id).await?;
    let (tally, total) = survey_tally(&responses, &survey).await?;
    Ok(Json(SurveyView::new(survey, tally, total, Utc::now())))
}

#[post("/surveys", data = "<spec>")]
async fn create_survey(
    token: Privileged,
    spec: Json<SurveySpec>,
    surveys: Coll<Survey>,
) -> Result<Json<SurveyDescription>> {
    let now = Utc::now();
    spec.validate(now).map_err(Error::Validation)?;
    let survey = Survey::new(spec.into_inner().into_survey(token.id, now));
    let survey = insert_resource(&surveys, survey).await?;
    Ok(Json(SurveyDescription::new(survey, now)))
}

#[post("/surveys/<survey_id>/close")]
async fn close_survey(
    _token: Privileged,
    survey_id: Id,
    surveys: Coll<Survey>,
) -> Result<Json<SurveyDescription>> {
    let survey = close_resource(&surveys, survey_id).await?;
    Ok(Json(SurveyDescription::new(survey, Utc::now())))
}

#[post("/surveys/<survey_id>/responses", data = "<request>")]
async fn respond_to_survey(
    token: AuthToken,
    survey_id: Id,
    request: Json<SurveyResponseRequest>,
    surveys: Coll<Survey>,
    responses: Coll<Response<SurveyAnswers>>,
) -> Result<Json<ResponseDescription<SurveyAnswers>>> {
    let now = Utc::now();
    let survey = find_resource(&surveys, survey_id).await?;
    ensure_open(&survey, now)?;
    let answers = request.answers_for(&survey).map_err(Error::BadRequest)?;

    let response = Response::new(NewResponse::new(survey.id(), token.id, answers, now));
    let response = record_response::<Survey, _>(&responses, response).await?;
    Ok(Json(response.into()))
}

#[get("/surveys/<survey_id>/responses/mine")]
async fn my_survey_response(
    token: AuthToken,
    survey_id: Id,
    surveys: Coll<Survey>,
    responses: Coll<Response<SurveyAnswers>>,
) -> Result<Json<RespondedStatus>> {
    let survey = find_resource(&surveys, survey_id).await?;
    let responded = has_responded(&responses, survey.id(), token.id).await?;
    Ok(Json(RespondedStatus { responded }))
}
