//! Member management tests.

mod common;

use mockall::predicate::eq;
use uuid::Uuid;

use common::{actor, user, Mocks};
use learnpath::domain::UserRole;
use learnpath::errors::AppError;
use learnpath::services::{NewMember, UserManager, UserService};
use learnpath::types::PaginationParams;

fn new_member(role: UserRole) -> NewMember {
    NewMember {
        email: "  New.Student@School.EDU ".to_string(),
        name: " Mia ".to_string(),
        password: "SecurePass123!".to_string(),
        role,
    }
}

#[tokio::test]
async fn teacher_creates_student_in_own_school() {
    let school_id = Uuid::new_v4();
    let teacher = actor(UserRole::Teacher, school_id);

    let mut mocks = Mocks::default();
    mocks
        .users
        .expect_find_by_email_with_deleted()
        .returning(|_| Ok(None));
    mocks.users.expect_create().times(1).returning(|new| {
        let mut created = user(new.id, new.school_id, new.role, &new.name);
        created.email = new.email;
        Ok(created)
    });

    let service = UserManager::new(mocks.build());
    let created = service
        .create_member(teacher, new_member(UserRole::Student))
        .await
        .unwrap();

    assert_eq!(created.school_id, school_id);
    assert_eq!(created.email, "new.student@school.edu");
    assert_eq!(created.name, "Mia");
    assert_eq!(created.role, UserRole::Student);
}

#[tokio::test]
async fn teacher_cannot_create_teacher() {
    let teacher = actor(UserRole::Teacher, Uuid::new_v4());
    let service = UserManager::new(Mocks::default().build());

    let result = service.create_member(teacher, new_member(UserRole::Teacher)).await;
    assert!(matches!(result, Err(AppError::Forbidden)));
}

#[tokio::test]
async fn nobody_creates_a_second_owner() {
    let owner = actor(UserRole::SchoolOwner, Uuid::new_v4());
    let service = UserManager::new(Mocks::default().build());

    let result = service.create_member(owner, new_member(UserRole::SchoolOwner)).await;
    assert!(matches!(result, Err(AppError::Forbidden)));
}

#[tokio::test]
async fn email_of_deleted_member_stays_taken() {
    let owner = actor(UserRole::SchoolOwner, Uuid::new_v4());

    let mut mocks = Mocks::default();
    mocks
        .users
        .expect_find_by_email_with_deleted()
        .returning(|email| {
            let mut existing = user(Uuid::new_v4(), Uuid::new_v4(), UserRole::Student, "Old");
            existing.email = email.to_string();
            existing.deleted_at = Some(chrono::Utc::now());
            Ok(Some(existing))
        });
    mocks.users.expect_create().never();

    let service = UserManager::new(mocks.build());
    let result = service.create_member(owner, new_member(UserRole::Student)).await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn students_cannot_list_members() {
    let student = actor(UserRole::Student, Uuid::new_v4());
    let service = UserManager::new(Mocks::default().build());

    let result = service
        .list_members(student, None, PaginationParams::default())
        .await;
    assert!(matches!(result, Err(AppError::Forbidden)));
}

#[tokio::test]
async fn list_members_is_scoped_to_the_school() {
    let school_id = Uuid::new_v4();
    let owner = actor(UserRole::SchoolOwner, school_id);

    let mut mocks = Mocks::default();
    mocks
        .users
        .expect_list_by_school()
        .withf(move |school, role, _| *school == school_id && *role == Some(UserRole::Teacher))
        .returning(move |_, _, _| {
            Ok((
                vec![user(Uuid::new_v4(), school_id, UserRole::Teacher, "Tom")],
                1,
            ))
        });

    let service = UserManager::new(mocks.build());
    let (members, total) = service
        .list_members(owner, Some(UserRole::Teacher), PaginationParams::default())
        .await
        .unwrap();

    assert_eq!(total, 1);
    assert_eq!(members[0].name, "Tom");
}

#[tokio::test]
async fn members_of_other_schools_are_not_found() {
    let owner = actor(UserRole::SchoolOwner, Uuid::new_v4());
    let target = Uuid::new_v4();

    let mut mocks = Mocks::default();
    mocks
        .users
        .expect_find_by_id()
        .with(eq(target))
        .returning(|id| Ok(Some(user(id, Uuid::new_v4(), UserRole::Student, "Eve"))));

    let service = UserManager::new(mocks.build());
    let result = service.get_member(owner, target).await;

    assert!(matches!(result, Err(AppError::NotFound)));
}

#[tokio::test]
async fn students_cannot_view_other_students() {
    let school_id = Uuid::new_v4();
    let student = actor(UserRole::Student, school_id);

    let mut mocks = Mocks::default();
    mocks
        .users
        .expect_find_by_id()
        .returning(move |id| Ok(Some(user(id, school_id, UserRole::Student, "Sam"))));

    let service = UserManager::new(mocks.build());
    let result = service.get_member(student, Uuid::new_v4()).await;

    assert!(matches!(result, Err(AppError::Forbidden)));
}

#[tokio::test]
async fn students_can_view_staff() {
    let school_id = Uuid::new_v4();
    let student = actor(UserRole::Student, school_id);

    let mut mocks = Mocks::default();
    mocks
        .users
        .expect_find_by_id()
        .returning(move |id| Ok(Some(user(id, school_id, UserRole::Teacher, "Tom"))));

    let service = UserManager::new(mocks.build());
    let teacher = service.get_member(student, Uuid::new_v4()).await.unwrap();

    assert_eq!(teacher.role, UserRole::Teacher);
}

#[tokio::test]
async fn cannot_delete_own_account() {
    let owner = actor(UserRole::SchoolOwner, Uuid::new_v4());
    let service = UserManager::new(Mocks::default().build());

    let result = service.delete_member(owner, owner.id).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
}

#[tokio::test]
async fn teacher_cannot_delete_another_teacher() {
    let school_id = Uuid::new_v4();
    let teacher = actor(UserRole::Teacher, school_id);

    let mut mocks = Mocks::default();
    mocks
        .users
        .expect_find_by_id()
        .returning(move |id| Ok(Some(user(id, school_id, UserRole::Teacher, "Tina"))));
    mocks.users.expect_delete().never();

    let service = UserManager::new(mocks.build());
    let result = service.delete_member(teacher, Uuid::new_v4()).await;

    assert!(matches!(result, Err(AppError::Forbidden)));
}

#[tokio::test]
async fn members_may_rename_themselves() {
    let school_id = Uuid::new_v4();
    let student = actor(UserRole::Student, school_id);

    let mut mocks = Mocks::default();
    mocks
        .users
        .expect_find_by_id()
        .returning(move |id| Ok(Some(user(id, school_id, UserRole::Student, "Sam"))));
    mocks
        .users
        .expect_update_name()
        .withf(|_, name| name == "Samuel")
        .returning(move |id, name| Ok(user(id, school_id, UserRole::Student, &name)));

    let service = UserManager::new(mocks.build());
    let renamed = service
        .update_member(student, student.id, "  Samuel ".to_string())
        .await
        .unwrap();

    assert_eq!(renamed.name, "Samuel");
}
