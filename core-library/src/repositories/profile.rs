//! Profile repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::Profile;
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};

/// User accounts
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Profile>>;

    async fn find_by_username(&self, username: &str) -> Result<Option<Profile>>;

    /// Insert a new profile
    ///
    /// # Errors
    /// `InvalidInput` if validation fails or the username is taken.
    async fn insert(&self, profile: &Profile) -> Result<()>;

    async fn list(&self) -> Result<Vec<Profile>>;
}

/// SQLite implementation of ProfileRepository
pub struct SqliteProfileRepository {
    pool: SqlitePool,
}

impl SqliteProfileRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileRepository for SqliteProfileRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Profile>> {
        let profile = query_as::<_, Profile>("SELECT * FROM profiles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(profile)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Profile>> {
        let profile = query_as::<_, Profile>("SELECT * FROM profiles WHERE username = ?")
            .bind(username.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(profile)
    }

    async fn insert(&self, profile: &Profile) -> Result<()> {
        profile
            .validate()
            .map_err(|e| LibraryError::InvalidInput {
                field: "Profile".to_string(),
                message: e,
            })?;

        if self.find_by_username(&profile.username).await?.is_some() {
            return Err(LibraryError::InvalidInput {
                field: "username".to_string(),
                message: format!("'{}' is already taken", profile.username),
            });
        }

        query(
            r#"
            INSERT INTO profiles (id, username, profile_photo_url, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&profile.id)
        .bind(profile.username.trim())
        .bind(&profile.profile_photo_url)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self) -> Result<Vec<Profile>> {
        let profiles = query_as::<_, Profile>("SELECT * FROM profiles ORDER BY username ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(profiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    #[tokio::test]
    async fn test_insert_and_find_profile() {
        let repo = SqliteProfileRepository::new(create_test_pool().await.unwrap());

        let profile = Profile::new("alice");
        repo.insert(&profile).await.unwrap();

        let by_id = repo.find_by_id(&profile.id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "alice");

        let by_name = repo.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(by_name.id, profile.id);

        assert!(repo.find_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let repo = SqliteProfileRepository::new(create_test_pool().await.unwrap());

        repo.insert(&Profile::new("alice")).await.unwrap();
        let result = repo.insert(&Profile::new("alice")).await;
        assert!(matches!(result, Err(LibraryError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_list_profiles_sorted() {
        let repo = SqliteProfileRepository::new(create_test_pool().await.unwrap());

        repo.insert(&Profile::new("carol")).await.unwrap();
        repo.insert(&Profile::new("alice")).await.unwrap();

        let names: Vec<String> = repo
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.username)
            .collect();
        assert_eq!(names, vec!["alice", "carol"]);
    }
}
