use async_trait::async_trait;
use carpool_core::repository::UserRepository;
use carpool_core::{CoreError, CoreResult, Gender, ProfileDetails, User, UserMode};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{conflict_on_unique, storage};

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: String,
    phone: Option<String>,
    image: Option<String>,
    gender: Option<String>,
    date_of_birth: Option<NaiveDate>,
    address: Option<String>,
    aadhaar_number: Option<String>,
    pan_number: Option<String>,
    driving_license_number: Option<String>,
    can_drive: bool,
    mode: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = CoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let gender = row.gender.as_deref().map(str::parse::<Gender>).transpose()?;
        let mode = row
            .mode
            .parse::<UserMode>()
            .map_err(|_| CoreError::Storage(format!("Unknown user mode: {}", row.mode)))?;

        Ok(User {
            id: row.id,
            email: row.email,
            name: row.name,
            phone: row.phone,
            image: row.image,
            gender,
            date_of_birth: row.date_of_birth,
            address: row.address,
            aadhaar_number: row.aadhaar_number,
            pan_number: row.pan_number,
            driving_license_number: row.driving_license_number,
            can_drive: row.can_drive,
            mode,
            password_hash: row.password_hash,
            created_at: row.created_at,
        })
    }
}

const USER_COLUMNS: &str = "id, email, name, phone, image, gender, date_of_birth, address, aadhaar_number, \
     pan_number, driving_license_number, can_drive, mode, password_hash, created_at";

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create_user(&self, user: &User) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, phone, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "User already exists"))?;
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> CoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        row.map(User::try_from).transpose()
    }

    async fn find_user(&self, id: Uuid) -> CoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        row.map(User::try_from).transpose()
    }

    async fn update_profile(
        &self,
        id: Uuid,
        name: Option<&str>,
        phone: Option<&str>,
    ) -> CoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
            SET name = COALESCE($2, name), phone = COALESCE($3, phone)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(phone)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;
        row.map(User::try_from).transpose()
    }

    async fn complete_profile(&self, id: Uuid, details: &ProfileDetails) -> CoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
            SET phone = $2, gender = $3, date_of_birth = $4, address = $5,
                aadhaar_number = $6, pan_number = $7, driving_license_number = $8,
                can_drive = TRUE
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&details.phone)
        .bind(details.gender.as_str())
        .bind(details.date_of_birth)
        .bind(&details.address)
        .bind(&details.aadhaar_number)
        .bind(&details.pan_number)
        .bind(&details.driving_license_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;
        row.map(User::try_from).transpose()
    }

    async fn set_mode(&self, id: Uuid, mode: UserMode) -> CoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET mode = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(mode.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;
        row.map(User::try_from).transpose()
    }

    async fn find_users(&self, ids: &[Uuid]) -> CoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)"))
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
        rows.into_iter().map(User::try_from).collect()
    }
}
