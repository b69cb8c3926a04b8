use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, from_document, Document},
    options::{FindOptions, IndexOptions, ReplaceOptions},
    Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;

use crate::models::{Enrollment, EnrollmentWithStudent, Profile};
use crate::services::store::ProfileStore;

#[derive(Clone)]
pub struct MongoProfileStore {
    client: MongoClient,
    db: Database,
}

impl MongoProfileStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!("Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for portal-service");

        // One profile per upstream identity
        let identity_index = IndexModel::builder()
            .keys(doc! { "identity_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("identity_id_unique".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        self.profiles()
            .create_index(identity_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create identity_id index on profiles: {}", e);
                AppError::from(e)
            })?;

        let profile_id_index = IndexModel::builder()
            .keys(doc! { "profile_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("profile_id_unique".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        self.profiles()
            .create_index(profile_id_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create profile_id index on profiles: {}", e);
                AppError::from(e)
            })?;

        let enrollment_owner_index = IndexModel::builder()
            .keys(doc! { "profile_id": 1, "enrolled_utc": -1 })
            .options(
                IndexOptions::builder()
                    .name("profile_enrollments".to_string())
                    .build(),
            )
            .build();

        self.enrollments()
            .create_index(enrollment_owner_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create profile_id index on enrollments: {}", e);
                AppError::from(e)
            })?;

        let course_index = IndexModel::builder()
            .keys(doc! { "course_id": 1, "enrolled_utc": -1 })
            .options(
                IndexOptions::builder()
                    .name("course_enrollments".to_string())
                    .build(),
            )
            .build();

        self.enrollments()
            .create_index(course_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create course_id index on enrollments: {}", e);
                AppError::from(e)
            })?;

        tracing::info!("MongoDB indexes ready");
        Ok(())
    }

    pub fn profiles(&self) -> Collection<Profile> {
        self.db.collection("profiles")
    }

    pub fn enrollments(&self) -> Collection<Enrollment> {
        self.db.collection("enrollments")
    }

    /// Enrollments matching `filter`, newest first, each joined with its
    /// student profile.
    async fn aggregate_enrollments(
        &self,
        filter: Option<Document>,
    ) -> Result<Vec<EnrollmentWithStudent>, AppError> {
        let mut pipeline = Vec::new();
        if let Some(filter) = filter {
            pipeline.push(doc! { "$match": filter });
        }
        pipeline.extend([
            doc! { "$sort": { "enrolled_utc": -1 } },
            doc! { "$lookup": {
                "from": "profiles",
                "localField": "profile_id",
                "foreignField": "profile_id",
                "as": "students",
            } },
            // A missing student leaves the field absent, which reads as None.
            doc! { "$project": {
                "_id": 0,
                "enrollment": "$$ROOT",
                "student": { "$arrayElemAt": ["$students", 0] },
            } },
        ]);

        let cursor = self.enrollments().aggregate(pipeline, None).await?;
        let documents: Vec<_> = cursor.try_collect().await?;

        documents
            .into_iter()
            .map(|document| {
                from_document::<EnrollmentWithStudent>(document).map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!(
                        "Failed to decode enrollment: {}",
                        e
                    ))
                })
            })
            .collect()
    }
}

#[async_trait]
impl ProfileStore for MongoProfileStore {
    async fn find_profile_by_identity_id(
        &self,
        identity_id: &str,
    ) -> Result<Option<Profile>, AppError> {
        self.profiles()
            .find_one(doc! { "identity_id": identity_id }, None)
            .await
            .map_err(AppError::from)
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, AppError> {
        let options = FindOptions::builder()
            .sort(doc! { "created_utc": -1 })
            .build();

        let cursor = self.profiles().find(None, options).await?;
        cursor.try_collect().await.map_err(|e| {
            tracing::error!("Failed to read profiles cursor: {}", e);
            AppError::from(e)
        })
    }

    async fn save_profile(&self, profile: &Profile) -> Result<(), AppError> {
        let options = ReplaceOptions::builder().upsert(true).build();

        self.profiles()
            .replace_one(doc! { "profile_id": profile.profile_id.as_str() }, profile, options)
            .await
            .map_err(|e| {
                tracing::error!(profile_id = %profile.profile_id, "Failed to save profile: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }

    async fn list_enrollments(&self) -> Result<Vec<EnrollmentWithStudent>, AppError> {
        self.aggregate_enrollments(None).await
    }

    async fn list_course_enrollments(
        &self,
        course_id: &str,
    ) -> Result<Vec<EnrollmentWithStudent>, AppError> {
        self.aggregate_enrollments(Some(doc! { "course_id": course_id }))
            .await
    }

    async fn find_enrollments_by_profile(
        &self,
        profile_id: &str,
    ) -> Result<Vec<Enrollment>, AppError> {
        let options = FindOptions::builder()
            .sort(doc! { "enrolled_utc": -1 })
            .build();

        let cursor = self
            .enrollments()
            .find(doc! { "profile_id": profile_id }, options)
            .await?;
        cursor.try_collect().await.map_err(AppError::from)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }
}

