//! Class and enrollment tests.

mod common;

use mockall::predicate::eq;
use uuid::Uuid;

use common::{actor, class, user, Mocks};
use learnpath::domain::UserRole;
use learnpath::errors::AppError;
use learnpath::services::{ClassInput, ClassManager, ClassService};

#[tokio::test]
async fn only_owner_creates_classes() {
    let teacher = actor(UserRole::Teacher, Uuid::new_v4());
    let service = ClassManager::new(Mocks::default().build());

    let result = service
        .create_class(
            teacher,
            ClassInput {
                name: "7B".to_string(),
                grade_level: 7,
                teacher_id: None,
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Forbidden)));
}

#[tokio::test]
async fn grade_level_must_be_in_range() {
    let owner = actor(UserRole::SchoolOwner, Uuid::new_v4());
    let service = ClassManager::new(Mocks::default().build());

    let result = service
        .create_class(
            owner,
            ClassInput {
                name: "Graduates".to_string(),
                grade_level: 14,
                teacher_id: None,
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn class_teacher_must_be_a_teacher_of_the_school() {
    let school_id = Uuid::new_v4();
    let owner = actor(UserRole::SchoolOwner, school_id);
    let student_id = Uuid::new_v4();

    let mut mocks = Mocks::default();
    mocks
        .users
        .expect_find_by_id()
        .with(eq(student_id))
        .returning(move |id| Ok(Some(user(id, school_id, UserRole::Student, "Sam"))));
    mocks.classes.expect_create().never();

    let service = ClassManager::new(mocks.build());
    let result = service
        .create_class(
            owner,
            ClassInput {
                name: "7B".to_string(),
                grade_level: 7,
                teacher_id: Some(student_id),
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn enroll_rejects_students_of_other_schools() {
    let school_id = Uuid::new_v4();
    let owner = actor(UserRole::SchoolOwner, school_id);
    let class_id = Uuid::new_v4();
    let local = Uuid::new_v4();
    let foreign = Uuid::new_v4();

    let mut mocks = Mocks::default();
    mocks
        .classes
        .expect_find_by_id()
        .returning(move |id| Ok(Some(class(id, school_id, None))));
    mocks.users.expect_find_many().returning(move |_| {
        Ok(vec![
            user(local, school_id, UserRole::Student, "Mia"),
            user(foreign, Uuid::new_v4(), UserRole::Student, "Eve"),
        ])
    });
    mocks.classes.expect_enroll().never();

    let service = ClassManager::new(mocks.build());
    let result = service.enroll_students(owner, class_id, vec![local, foreign]).await;

    match result {
        Err(AppError::Validation(msg)) => {
            assert!(msg.contains(&foreign.to_string()));
            assert!(!msg.contains(&local.to_string()));
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn enroll_ignores_duplicate_ids() {
    let school_id = Uuid::new_v4();
    let owner = actor(UserRole::SchoolOwner, school_id);
    let class_id = Uuid::new_v4();
    let student_id = Uuid::new_v4();

    let mut mocks = Mocks::default();
    mocks
        .classes
        .expect_find_by_id()
        .returning(move |id| Ok(Some(class(id, school_id, None))));
    mocks
        .users
        .expect_find_many()
        .with(eq(vec![student_id]))
        .returning(move |_| Ok(vec![user(student_id, school_id, UserRole::Student, "Mia")]));
    mocks
        .classes
        .expect_enroll()
        .with(eq(class_id), eq(vec![student_id]))
        .times(1)
        .returning(|_, _| Ok(()));

    let service = ClassManager::new(mocks.build());
    let enrolled = service
        .enroll_students(owner, class_id, vec![student_id, student_id])
        .await
        .unwrap();

    assert_eq!(enrolled.len(), 1);
}

#[tokio::test]
async fn teachers_only_manage_their_own_classes() {
    let school_id = Uuid::new_v4();
    let teacher = actor(UserRole::Teacher, school_id);

    let mut mocks = Mocks::default();
    mocks
        .classes
        .expect_find_by_id()
        .returning(move |id| Ok(Some(class(id, school_id, Some(Uuid::new_v4())))));
    mocks.classes.expect_student_ids().never();

    let service = ClassManager::new(mocks.build());
    let result = service.list_students(teacher, Uuid::new_v4()).await;

    assert!(matches!(result, Err(AppError::Forbidden)));
}

#[tokio::test]
async fn list_students_sorted_by_name() {
    let school_id = Uuid::new_v4();
    let teacher = actor(UserRole::Teacher, school_id);
    let teacher_id = teacher.id;

    let mut mocks = Mocks::default();
    mocks
        .classes
        .expect_find_by_id()
        .returning(move |id| Ok(Some(class(id, school_id, Some(teacher_id)))));
    mocks
        .classes
        .expect_student_ids()
        .returning(|_| Ok(vec![Uuid::new_v4(), Uuid::new_v4()]));
    mocks.users.expect_find_many().returning(move |ids| {
        Ok(vec![
            user(ids[0], school_id, UserRole::Student, "Zoe"),
            user(ids[1], school_id, UserRole::Student, "Adam"),
        ])
    });

    let service = ClassManager::new(mocks.build());
    let students = service.list_students(teacher, Uuid::new_v4()).await.unwrap();

    let names: Vec<&str> = students.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["Adam", "Zoe"]);
}

#[tokio::test]
async fn removing_a_student_who_is_not_enrolled_is_not_found() {
    let school_id = Uuid::new_v4();
    let owner = actor(UserRole::SchoolOwner, school_id);

    let mut mocks = Mocks::default();
    mocks
        .classes
        .expect_find_by_id()
        .returning(move |id| Ok(Some(class(id, school_id, None))));
    mocks
        .classes
        .expect_remove_student()
        .returning(|_, _| Ok(false));

    let service = ClassManager::new(mocks.build());
    let result = service
        .remove_student(owner, Uuid::new_v4(), Uuid::new_v4())
        .await;

    assert!(matches!(result, Err(AppError::NotFound)));
}

#[tokio::test]
async fn students_see_only_classes_they_attend() {
    let school_id = Uuid::new_v4();
    let student = actor(UserRole::Student, school_id);

    let mut mocks = Mocks::default();
    mocks
        .classes
        .expect_find_by_id()
        .returning(move |id| Ok(Some(class(id, school_id, None))));
    mocks
        .classes
        .expect_student_ids()
        .returning(|_| Ok(vec![Uuid::new_v4()]));

    let service = ClassManager::new(mocks.build());
    let result = service.get_class(student, Uuid::new_v4()).await;

    assert!(matches!(result, Err(AppError::Forbidden)));
}
