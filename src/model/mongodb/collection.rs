use std::ops::Deref;

use log::debug;
use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::model::db::{Poll, PollChoice, Response, Survey, SurveyAnswers, User};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r, T> FromRequest<'r> for Coll<T>
where
    T: MongoCollection,
{
    type Error = ();

    /// Get the database connection from the managed state and wrap it in a collection.
    ///
    /// Panics iff the [`Database`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let db = req.guard::<&State<Database>>().await.unwrap();
        request::Outcome::Success(Coll::from_db(db))
    }
}

// User collection
const USERS: &str = "users";
impl MongoCollection for User {
    const NAME: &'static str = USERS;
}

// Poll collection
const POLLS: &str = "polls";
impl MongoCollection for Poll {
    const NAME: &'static str = POLLS;
}

// Survey collection
const SURVEYS: &str = "surveys";
impl MongoCollection for Survey {
    const NAME: &'static str = SURVEYS;
}

// Response collections, one per resource kind.
const POLL_RESPONSES: &str = "poll_responses";
impl MongoCollection for Response<PollChoice> {
    const NAME: &'static str = POLL_RESPONSES;
}

const SURVEY_RESPONSES: &str = "survey_responses";
impl MongoCollection for Response<SurveyAnswers> {
    const NAME: &'static str = SURVEY_RESPONSES;
}

/// Ensure that all the required indexes exist on the given database.
///
/// The `(resource_id, user_id)` indexes on the response collections are what
/// enforce one response per user per resource; handlers rely on the resulting
/// duplicate key errors rather than checking beforehand.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // User collection.
    let user_index = IndexModel::builder()
        .keys(doc! {"username": 1})
        .options(unique.clone())
        .build();
    Coll::<User>::from_db(db)
        .create_index(user_index, None)
        .await?;

    // Resource collections: unique titles, plus listing order.
    let title_index = || {
        IndexModel::builder()
            .keys(doc! {"title": 1})
            .options(unique.clone())
            .build()
    };
    let listing_index = || {
        IndexModel::builder()
            .keys(doc! {"status": 1, "created_at": -1})
            .build()
    };
    let polls = Coll::<Poll>::from_db(db);
    polls.create_index(title_index(), None).await?;
    polls.create_index(listing_index(), None).await?;
    let surveys = Coll::<Survey>::from_db(db);
    surveys.create_index(title_index(), None).await?;
    surveys.create_index(listing_index(), None).await?;

    // Response collections.
    let response_index = || {
        IndexModel::builder()
            .keys(doc! {"resource_id": 1, "user_id": 1})
            .options(unique.clone())
            .build()
    };
    Coll::<Response<PollChoice>>::from_db(db)
        .create_index(response_index(), None)
        .await?;
    Coll::<Response<SurveyAnswers>>::from_db(db)
        .create_index(response_index(), None)
        .await?;

    Ok(())
}
