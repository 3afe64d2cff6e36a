use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

/// User role for authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "admin" => UserRole::Admin,
            _ => UserRole::User,
        }
    }
}

/// Account lifecycle state. Only active accounts pass authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// Registered, email not yet verified
    Pending,
    Active,
    /// Disabled by an admin; all tokens are dead via the watermark
    Disabled,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Pending => "pending",
            AccountStatus::Active => "active",
            AccountStatus::Disabled => "disabled",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "active" => AccountStatus::Active,
            "disabled" => AccountStatus::Disabled,
            _ => AccountStatus::Pending,
        }
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub status: AccountStatus,
    pub role: UserRole,
    /// Unix timestamp; tokens with `iat` before this are rejected
    pub tokens_valid_after: i64,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    status: String,
    role: String,
    tokens_valid_after: i64,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            status: AccountStatus::from_str(&row.status),
            role: UserRole::from_str(&row.role),
            tokens_valid_after: row.tokens_valid_after,
        }
    }
}

/// Public user summary for the admin listing. Does not expose password hashes.
#[derive(Debug, Clone, serde::Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub status: AccountStatus,
    pub role: UserRole,
    pub created_at: String,
}

#[derive(sqlx::FromRow)]
struct UserSummaryRow {
    id: i64,
    username: String,
    email: String,
    status: String,
    role: String,
    created_at: String,
}

impl From<UserSummaryRow> for UserSummary {
    fn from(row: UserSummaryRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            status: AccountStatus::from_str(&row.status),
            role: UserRole::from_str(&row.role),
            created_at: row.created_at,
        }
    }
}

const SELECT_USER: &str = "SELECT id, username, email, password_hash, status, role, tokens_valid_after FROM users";

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new pending user. Returns the user ID.
    pub async fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO users (username, email, password_hash, status) VALUES (?, ?, ?, 'pending')",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Create an active admin user. Returns the user ID.
    pub async fn create_admin(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO users (username, email, password_hash, status, role) VALUES (?, ?, ?, 'active', 'admin')",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as(&format!("{} WHERE id = ?", SELECT_USER))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    /// Get a user by username.
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as(&format!("{} WHERE username = ?", SELECT_USER))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    /// Get a user by email address.
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as(&format!("{} WHERE email = ?", SELECT_USER))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    /// Get a user by username or email, for login.
    pub async fn get_by_login(&self, ident: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("{} WHERE username = ? OR email = ?", SELECT_USER))
                .bind(ident)
                .bind(ident)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(User::from))
    }

    /// Mark a pending user active, inside the caller's transaction.
    pub async fn activate_in_tx(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        id: i64,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE users SET status = 'active' WHERE id = ? AND status = 'pending'")
                .bind(id)
                .execute(&mut **tx)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace a user's password hash and advance the token watermark so
    /// tokens issued before `valid_after` stop validating. Runs inside the
    /// caller's transaction.
    pub async fn set_password_in_tx(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        id: i64,
        password_hash: &str,
        valid_after: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = ?, tokens_valid_after = ? WHERE id = ?",
        )
        .bind(password_hash)
        .bind(valid_after)
        .bind(id)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Disable an account and advance the token watermark, killing every
    /// outstanding token for the user regardless of jti.
    pub async fn disable(&self, id: i64, valid_after: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET status = 'disabled', tokens_valid_after = ? WHERE id = ?",
        )
        .bind(valid_after)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete pending users whose verification window has long passed.
    pub async fn cleanup_pending(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM users WHERE status = 'pending' AND created_at < datetime('now', '-2 days')",
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// List all users for the admin dashboard.
    pub async fn list(&self) -> Result<Vec<UserSummary>, sqlx::Error> {
        let rows: Vec<UserSummaryRow> = sqlx::query_as(
            "SELECT id, username, email, status, role, created_at FROM users ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(UserSummary::from).collect())
    }
}
