use anyhow::{Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::domain::{StudentProfile, UserId};

pub async fn insert_profile(conn: &mut SqliteConnection, profile: &StudentProfile) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO student_profiles (user_id, email, grade, registration_year, completed)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(profile.user_id)
    .bind(&profile.email)
    .bind(i64::from(profile.grade))
    .bind(profile.registration_year)
    .bind(profile.completed)
    .execute(&mut *conn)
    .await
    .context("Failed to save student profile")?;
    Ok(())
}

pub async fn find_profile(
    conn: &mut SqliteConnection,
    user_id: UserId,
) -> Result<Option<StudentProfile>> {
    let row = sqlx::query(
        r#"
        SELECT user_id, email, grade, registration_year, completed
        FROM student_profiles
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await
    .context("Failed to fetch student profile")?;

    row.as_ref().map(row_to_profile).transpose()
}

pub async fn update_profile(conn: &mut SqliteConnection, profile: &StudentProfile) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE student_profiles
        SET email = ?, grade = ?, completed = ?
        WHERE user_id = ?
        "#,
    )
    .bind(&profile.email)
    .bind(i64::from(profile.grade))
    .bind(profile.completed)
    .bind(profile.user_id)
    .execute(&mut *conn)
    .await
    .context("Failed to update student profile")?;
    Ok(())
}

fn row_to_profile(row: &SqliteRow) -> Result<StudentProfile> {
    let grade: i64 = row.get("grade");
    Ok(StudentProfile {
        user_id: row.get("user_id"),
        email: row.get("email"),
        grade: u8::try_from(grade)
            .with_context(|| format!("Invalid grade in database: {}", grade))?,
        registration_year: row.get("registration_year"),
        completed: row.get("completed"),
    })
}
