mod common;

use anyhow::Result;
use common::test_service;
use controla::application::AppError;
use controla::domain::ProfileChanges;

#[tokio::test]
async fn test_profile_is_created_with_the_user() -> Result<()> {
    // The test clock is frozen in 2025.
    let (service, _temp) = test_service().await?;
    let user = service.create_user("ana").await?;

    let profile = service.get_profile(user.id).await?;
    assert_eq!(profile.user_id, user.id);
    assert_eq!(profile.grade, 1);
    assert_eq!(profile.registration_year, 2025);
    assert!(profile.email.is_empty());
    assert!(!profile.completed);

    let result = service.create_user("ana").await;
    assert!(matches!(result, Err(AppError::UserAlreadyExists(_))));

    let result = service.get_profile(9999).await;
    assert!(matches!(result, Err(AppError::ProfileNotFound(9999))));

    Ok(())
}

#[tokio::test]
async fn test_profile_update() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let ana = service.create_user("ana").await?.id;
    let ben = service.create_user("ben").await?.id;

    let updated = service
        .update_profile(
            ana,
            ProfileChanges {
                email: Some("ana@school.edu".to_string()),
                grade: Some(3),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(updated.email, "ana@school.edu");
    assert_eq!(updated.grade, 3);
    assert_eq!(service.get_profile(ana).await?, updated);

    let completed = service
        .update_profile(
            ana,
            ProfileChanges {
                completed: Some(true),
                ..Default::default()
            },
        )
        .await?;
    assert!(completed.completed);
    assert_eq!(completed.grade, 3);

    // Other users are untouched.
    let other = service.get_profile(ben).await?;
    assert_eq!(other.grade, 1);
    assert!(!other.completed);

    Ok(())
}

#[tokio::test]
async fn test_profile_update_rejects_invalid_values() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let owner = service.create_user("ana").await?.id;

    for changes in [
        ProfileChanges {
            grade: Some(0),
            ..Default::default()
        },
        ProfileChanges {
            grade: Some(4),
            ..Default::default()
        },
        ProfileChanges {
            email: Some("not-an-email".to_string()),
            ..Default::default()
        },
    ] {
        let result = service.update_profile(owner, changes).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    let profile = service.get_profile(owner).await?;
    assert_eq!(profile.grade, 1);
    assert!(profile.email.is_empty());

    let result = service
        .update_profile(9999, ProfileChanges::default())
        .await;
    assert!(matches!(result, Err(AppError::ProfileNotFound(_))));

    Ok(())
}
