//! Analytics and gamification service tests.

mod common;

use chrono::Utc;
use mockall::predicate::eq;
use uuid::Uuid;

use common::{actor, class, completed, node, subject, subject_progress, user, user_for, Mocks};
use learnpath::domain::{Enrollment, Streak, UnlockedAchievement, UserRole};
use learnpath::errors::AppError;
use learnpath::services::{
    AnalyticsManager, AnalyticsService, GamificationManager, GamificationService,
};

#[tokio::test]
async fn school_overview_is_owner_only() {
    let teacher = actor(UserRole::Teacher, Uuid::new_v4());
    let service = AnalyticsManager::new(Mocks::default().build());

    let result = service.school_overview(teacher).await;
    assert!(matches!(result, Err(AppError::Forbidden)));
}

#[tokio::test]
async fn school_overview_summarizes_classes() {
    let school_id = Uuid::new_v4();
    let owner = actor(UserRole::SchoolOwner, school_id);
    let class_id = Uuid::new_v4();
    let (mia, sam) = (Uuid::new_v4(), Uuid::new_v4());

    let mut mocks = Mocks::default();
    mocks
        .users
        .expect_count_by_role()
        .with(eq(school_id), eq(UserRole::Teacher))
        .returning(|_, _| Ok(2));
    mocks.users.expect_list_by_role().returning(move |_, _| {
        Ok(vec![
            user(mia, school_id, UserRole::Student, "Mia"),
            user(sam, school_id, UserRole::Student, "Sam"),
        ])
    });
    mocks
        .classes
        .expect_list_by_school()
        .returning(move |_| Ok(vec![class(class_id, school_id, None)]));
    mocks.subjects.expect_count_by_school().returning(|_| Ok(3));
    mocks
        .progress
        .expect_subject_progress_for_students()
        .returning(move |_| {
            Ok(vec![
                subject_progress(mia, Uuid::new_v4(), 8, 10),
                subject_progress(sam, Uuid::new_v4(), 2, 10),
            ])
        });
    mocks.classes.expect_enrollments().returning(move |_| {
        Ok(vec![Enrollment {
            class_id,
            student_id: mia,
        }])
    });

    let service = AnalyticsManager::new(mocks.build());
    let overview = service.school_overview(owner).await.unwrap();

    assert_eq!(overview.teacher_count, 2);
    assert_eq!(overview.student_count, 2);
    assert_eq!(overview.subject_count, 3);
    assert_eq!(overview.active_students, 2);
    assert_eq!(overview.classes.len(), 1);
    assert_eq!(overview.classes[0].student_count, 1);
    assert!((overview.classes[0].average_accuracy - 0.8).abs() < 1e-9);
}

#[tokio::test]
async fn teachers_only_see_their_own_dashboard() {
    let teacher = actor(UserRole::Teacher, Uuid::new_v4());
    let service = AnalyticsManager::new(Mocks::default().build());

    let result = service.teacher_dashboard(teacher, Uuid::new_v4()).await;
    assert!(matches!(result, Err(AppError::Forbidden)));
}

#[tokio::test]
async fn dashboard_flags_struggling_students() {
    let school_id = Uuid::new_v4();
    let teacher = actor(UserRole::Teacher, school_id);
    let class_id = Uuid::new_v4();
    let (mia, sam) = (Uuid::new_v4(), Uuid::new_v4());
    let teacher_id = teacher.id;

    let mut mocks = Mocks::default();
    mocks
        .classes
        .expect_list_by_teacher()
        .with(eq(teacher_id))
        .returning(move |_| Ok(vec![class(class_id, school_id, Some(teacher_id))]));
    mocks.classes.expect_enrollments().returning(move |_| {
        Ok(vec![
            Enrollment {
                class_id,
                student_id: mia,
            },
            Enrollment {
                class_id,
                student_id: sam,
            },
        ])
    });
    mocks.users.expect_find_many().returning(move |_| {
        let mut top = user(mia, school_id, UserRole::Student, "Mia");
        top.xp = 300;
        Ok(vec![top, user(sam, school_id, UserRole::Student, "Sam")])
    });
    mocks
        .progress
        .expect_subject_progress_for_students()
        .returning(move |_| {
            Ok(vec![
                subject_progress(mia, Uuid::new_v4(), 18, 20),
                subject_progress(sam, Uuid::new_v4(), 3, 20),
            ])
        });

    let service = AnalyticsManager::new(mocks.build());
    let dashboard = service.teacher_dashboard(teacher, teacher_id).await.unwrap();

    assert_eq!(dashboard.classes[0].student_count, 2);
    assert_eq!(dashboard.struggling_students.len(), 1);
    assert_eq!(dashboard.struggling_students[0].student_id, sam);
    assert_eq!(dashboard.top_students[0].student_id, mia);
}

#[tokio::test]
async fn path_analytics_reports_bottlenecks() {
    let school_id = Uuid::new_v4();
    let teacher = actor(UserRole::Teacher, school_id);
    let subject_id = Uuid::new_v4();
    let easy = node(subject_id, "Counting", vec![]);
    let hard = node(subject_id, "Fractions", vec![easy.id]);
    let hard_id = hard.id;

    let (mia, sam) = (Uuid::new_v4(), Uuid::new_v4());
    let mut stuck = completed(sam, &hard);
    stuck.status = learnpath::domain::NodeStatus::InProgress;
    stuck.completed_at = None;
    stuck.best_score = 0.4;
    let records = vec![
        completed(mia, &easy),
        completed(sam, &easy),
        completed(mia, &hard),
        stuck,
    ];
    let nodes = vec![easy, hard];

    let mut mocks = Mocks::default();
    mocks
        .subjects
        .expect_find_by_id()
        .returning(move |id| Ok(Some(subject(id, school_id))));
    mocks
        .skill_tree
        .expect_list_nodes()
        .returning(move |_| Ok(nodes.clone()));
    mocks
        .progress
        .expect_node_progress_for_subject()
        .returning(move |_| Ok(records.clone()));

    let service = AnalyticsManager::new(mocks.build());
    let report = service.path_analytics(teacher, subject_id).await.unwrap();

    assert_eq!(report.nodes.len(), 2);
    assert_eq!(report.nodes[1].attempting, 2);
    assert_eq!(report.nodes[1].completed, 1);
    assert!((report.nodes[1].completion_rate - 0.5).abs() < 1e-9);
    assert_eq!(report.bottlenecks[0].node_id, hard_id);
}

#[tokio::test]
async fn profile_lists_every_achievement() {
    let student = actor(UserRole::Student, Uuid::new_v4());
    let mut row = user_for(&student, "Mia");
    row.xp = 120;
    let student_id = student.id;
    let today = Utc::now().date_naive();

    let mut mocks = Mocks::default();
    mocks
        .users
        .expect_find_by_id()
        .returning(move |_| Ok(Some(row.clone())));
    mocks.progress.expect_streak().returning(move |_| {
        Ok(Some(Streak {
            student_id,
            current: 4,
            longest: 6,
            last_active_date: Some(today),
        }))
    });
    mocks.progress.expect_achievements().returning(move |_| {
        Ok(vec![UnlockedAchievement {
            student_id,
            code: "FIRST_STEPS".to_string(),
            unlocked_at: Utc::now(),
        }])
    });

    let service = GamificationManager::new(mocks.build());
    let profile = service.profile(student).await.unwrap();

    assert_eq!(profile.xp, 120);
    assert_eq!(profile.level, 2);
    assert_eq!(profile.next_level_xp, 200);
    assert_eq!(profile.streak.current, 4);
    assert_eq!(profile.achievements.len(), 9);
    let unlocked: Vec<&str> = profile
        .achievements
        .iter()
        .filter(|a| a.unlocked_at.is_some())
        .map(|a| a.code.as_str())
        .collect();
    assert_eq!(unlocked, ["FIRST_STEPS"]);
}

#[tokio::test]
async fn broken_streak_reads_as_zero() {
    let student = actor(UserRole::Student, Uuid::new_v4());
    let row = user_for(&student, "Mia");
    let student_id = student.id;
    let long_ago = Utc::now().date_naive() - chrono::Duration::days(5);

    let mut mocks = Mocks::default();
    mocks
        .users
        .expect_find_by_id()
        .returning(move |_| Ok(Some(row.clone())));
    mocks.progress.expect_streak().returning(move |_| {
        Ok(Some(Streak {
            student_id,
            current: 4,
            longest: 4,
            last_active_date: Some(long_ago),
        }))
    });
    mocks.progress.expect_achievements().returning(|_| Ok(vec![]));

    let service = GamificationManager::new(mocks.build());
    let profile = service.profile(student).await.unwrap();

    assert_eq!(profile.streak.current, 0);
    assert_eq!(profile.streak.longest, 4);
}

#[tokio::test]
async fn leaderboard_is_closed_to_other_classes() {
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
    mocks.users.expect_find_many().never();

    let service = GamificationManager::new(mocks.build());
    let result = service.leaderboard(student, Uuid::new_v4(), None).await;

    assert!(matches!(result, Err(AppError::Forbidden)));
}

#[tokio::test]
async fn leaderboard_ranks_by_xp_and_respects_limit() {
    let school_id = Uuid::new_v4();
    let student = actor(UserRole::Student, school_id);
    let me = student.id;

    let mut mocks = Mocks::default();
    mocks
        .classes
        .expect_find_by_id()
        .returning(move |id| Ok(Some(class(id, school_id, None))));
    mocks
        .classes
        .expect_student_ids()
        .returning(move |_| Ok(vec![me, Uuid::new_v4(), Uuid::new_v4()]));
    mocks.users.expect_find_many().returning(move |ids| {
        Ok(ids
            .iter()
            .zip([("Mia", 50), ("Ada", 300), ("Zoe", 300)])
            .map(|(id, (name, xp))| {
                let mut u = user(*id, school_id, UserRole::Student, name);
                u.xp = xp;
                u
            })
            .collect())
    });

    let service = GamificationManager::new(mocks.build());
    let board = service.leaderboard(student, Uuid::new_v4(), Some(2)).await.unwrap();

    let names: Vec<&str> = board.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["Ada", "Zoe"]);
    assert_eq!(board[0].rank, 1);
    assert_eq!(board[1].rank, 2);
}
