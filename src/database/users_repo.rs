// Users repository for counsel-review
// Handles CRUD operations for users

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use super::models::{User, UserRole};
use super::DatabaseManager;

impl DatabaseManager {
    /// Create a new user
    pub fn create_user(&self, user: &User) -> Result<String> {
        self.with_connection(|conn| create_user_impl(conn, user))
    }

    /// Get a user by ID
    pub fn get_user(&self, id: &str) -> Result<Option<User>> {
        self.with_connection(|conn| get_user_impl(conn, id))
    }

    /// Get all users with a given role (supervisors for the assignment picker)
    pub fn get_users_by_role(&self, role: UserRole) -> Result<Vec<User>> {
        self.with_connection(|conn| get_users_by_role_impl(conn, role))
    }
}

fn create_user_impl(conn: &Connection, user: &User) -> Result<String> {
    conn.execute(
        r#"
        INSERT INTO users (id, full_name, email, role, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
        params![
            user.id,
            user.full_name,
            user.email,
            user.role.as_str(),
            user.created_at,
        ],
    )
    .context("Failed to create user")?;

    Ok(user.id.clone())
}

fn get_user_impl(conn: &Connection, id: &str) -> Result<Option<User>> {
    let mut stmt = conn
        .prepare("SELECT id, full_name, email, role, created_at FROM users WHERE id = ?")
        .context("Failed to prepare get_user query")?;

    let result = stmt.query_row(params![id], |row| {
        Ok(User {
            id: row.get(0)?,
            full_name: row.get(1)?,
            email: row.get(2)?,
            role: UserRole::from_str(&row.get::<_, String>(3)?),
            created_at: row.get(4)?,
        })
    });

    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to get user"),
    }
}

fn get_users_by_role_impl(conn: &Connection, role: UserRole) -> Result<Vec<User>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT id, full_name, email, role, created_at
            FROM users
            WHERE role = ?
            ORDER BY full_name ASC
            "#,
        )
        .context("Failed to prepare get_users_by_role query")?;

    let users = stmt
        .query_map(params![role.as_str()], |row| {
            Ok(User {
                id: row.get(0)?,
                full_name: row.get(1)?,
                email: row.get(2)?,
                role: UserRole::from_str(&row.get::<_, String>(3)?),
                created_at: row.get(4)?,
            })
        })
        .context("Failed to query users by role")?;

    users
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect users")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn create_test_db() -> DatabaseManager {
        let db_path = tempdir().unwrap().keep().join("test.db");
        DatabaseManager::new(db_path).unwrap()
    }

    #[test]
    fn test_create_and_get_user() {
        let db = create_test_db();

        let user = User::new("Dana Reyes", "dana@example.com", UserRole::Supervisor);
        db.create_user(&user).unwrap();

        let retrieved = db.get_user(&user.id).unwrap().unwrap();
        assert_eq!(retrieved.full_name, "Dana Reyes");
        assert_eq!(retrieved.role, UserRole::Supervisor);
    }

    #[test]
    fn test_get_users_by_role() {
        let db = create_test_db();

        db.create_user(&User::new("A", "a@example.com", UserRole::Counselor))
            .unwrap();
        db.create_user(&User::new("B", "b@example.com", UserRole::Supervisor))
            .unwrap();
        db.create_user(&User::new("C", "c@example.com", UserRole::Supervisor))
            .unwrap();

        let supervisors = db.get_users_by_role(UserRole::Supervisor).unwrap();
        assert_eq!(supervisors.len(), 2);
        assert!(supervisors.iter().all(|u| u.role == UserRole::Supervisor));
    }
}
