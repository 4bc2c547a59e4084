//! Store operations shared by the poll and survey endpoints.

use chrono::{DateTime, Utc};
use log::debug;
use mongodb::{bson::doc, options::FindOptions};
use rocket::futures::TryStreamExt;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    api::auth::Credentials,
    auth::Role,
    common::{tally::tally_answers, Resource, ResourceMetadata, ResourceStatus, TallyResult},
    db::{NewUser, Poll, PollChoice, Response, Survey, SurveyAnswers, User},
    mongodb::{is_duplicate_key_error, Coll, Id, MongoCollection},
};

/// Look up a resource by ID.
pub async fn find_resource<T>(resources: &Coll<T>, id: Id) -> Result<T>
where
    T: Resource + MongoCollection + DeserializeOwned + Unpin + Send + Sync,
{
    resources
        .find_one(id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("{} {id}", capitalised(T::KIND))))
}

/// Fail unless `resource` is accepting responses at `now`.
pub fn ensure_open<T: Resource>(resource: &T, now: DateTime<Utc>) -> Result<()> {
    if resource.metadata().is_open_at(now) {
        Ok(())
    } else {
        Err(Error::BadRequest(format!(
            "This {} is closed to responses",
            T::KIND
        )))
    }
}

/// List resources with the given effective status, newest first.
pub async fn list_resources<T>(
    resources: &Coll<T>,
    status: Option<ResourceStatus>,
    now: DateTime<Utc>,
) -> Result<Vec<T>>
where
    T: Resource + MongoCollection + DeserializeOwned + Unpin + Send + Sync,
{
    let filter = ResourceMetadata::status_filter(status, now);
    let newest_first = FindOptions::builder()
        .sort(doc! { "created_at": -1, "_id": -1 })
        .build();
    let list = resources
        .find(filter, newest_first)
        .await?
        .try_collect()
        .await?;
    Ok(list)
}

/// Insert a new resource. Titles are unique per kind.
pub async fn insert_resource<T>(resources: &Coll<T>, resource: T) -> Result<T>
where
    T: Resource + MongoCollection + Serialize,
{
    match resources.insert_one(&resource, None).await {
        Ok(_) => {
            debug!("Created {} {}", T::KIND, resource.id());
            Ok(resource)
        }
        Err(e) if is_duplicate_key_error(&e) => Err(Error::Conflict(format!(
            "A {} titled \"{}\" already exists",
            T::KIND,
            resource.metadata().title
        ))),
        Err(e) => Err(e.into()),
    }
}

/// Close a resource to further responses.
pub async fn close_resource<T>(resources: &Coll<T>, id: Id) -> Result<T>
where
    T: Resource + MongoCollection + DeserializeOwned + Unpin + Send + Sync,
{
    let filter = doc! {
        "_id": id,
        "status": ResourceStatus::Active,
    };
    let update = doc! {
        "$set": { "status": ResourceStatus::Closed },
    };
    let result = resources.update_one(filter, update, None).await?;
    if result.matched_count == 0 {
        // Either it does not exist, or it was closed already.
        find_resource(resources, id).await?;
        return Err(Error::BadRequest(format!(
            "This {} is already closed",
            T::KIND
        )));
    }
    find_resource(resources, id).await
}

/// Record a user's response. At most one response per user per resource is
/// accepted; the unique index on the response collection enforces this.
pub async fn record_response<T, C>(
    responses: &Coll<Response<C>>,
    response: Response<C>,
) -> Result<Response<C>>
where
    T: Resource,
    C: Serialize,
    Response<C>: MongoCollection,
{
    match responses.insert_one(&response, None).await {
        Ok(_) => {
            debug!(
                "Recorded response {} to {} {}",
                response.id,
                T::KIND,
                response.resource_id
            );
            Ok(response)
        }
        Err(e) if is_duplicate_key_error(&e) => Err(Error::Conflict(format!(
            "You have already responded to this {}",
            T::KIND
        ))),
        Err(e) => Err(e.into()),
    }
}

/// Whether the user has a recorded response to the resource.
pub async fn has_responded<C>(
    responses: &Coll<Response<C>>,
    resource_id: Id,
    user_id: Id,
) -> Result<bool>
where
    Response<C>: MongoCollection,
{
    let filter = doc! {
        "resource_id": resource_id,
        "user_id": user_id,
    };
    let count = responses.count_documents(filter, None).await?;
    Ok(count > 0)
}

/// The live tally of a poll.
pub async fn poll_tally(responses: &Coll<Response<PollChoice>>, poll: &Poll) -> Result<TallyResult> {
    let choices: Vec<usize> = responses
        .find(doc! { "resource_id": poll.id }, None)
        .await?
        .map_ok(|response| response.choice.0 as usize)
        .try_collect()
        .await?;
    Ok(TallyResult::tally(poll.options.len(), choices))
}

/// The live per-question tallies of a survey, and its number of responses.
pub async fn survey_tally(
    responses: &Coll<Response<SurveyAnswers>>,
    survey: &Survey,
) -> Result<(Vec<TallyResult>, u64)> {
    let answers: Vec<Response<SurveyAnswers>> = responses
        .find(doc! { "resource_id": survey.id }, None)
        .await?
        .try_collect()
        .await?;
    let tallies = tally_answers(
        &survey.option_counts(),
        answers.iter().map(|response| &response.choice),
    );
    Ok((tallies, answers.len() as u64))
}

/// Hash the password and insert a new user. Usernames are unique.
pub async fn insert_user(users: &Coll<User>, credentials: Credentials, role: Role) -> Result<User> {
    let username = credentials.username.clone();
    let user = User::new(NewUser::new(credentials, role)?);
    match users.insert_one(&user, None).await {
        Ok(_) => Ok(user),
        Err(e) if is_duplicate_key_error(&e) => Err(Error::Conflict(format!(
            "Username already in use: {username}"
        ))),
        Err(e) => Err(e.into()),
    }
}

fn capitalised(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitalise_kind() {
        assert_eq!(capitalised("poll"), "Poll");
        assert_eq!(capitalised(""), "");
    }
}
