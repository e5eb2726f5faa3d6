//! OpenAPI documentation, served through Swagger UI.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::handlers::{
    analytics_handler, auth_handler, chat_handler, class_handler, gamification_handler,
    progress_handler, school_handler, skill_tree_handler, subject_handler, user_handler,
};
use crate::domain::{
    AchievementView, ChatExchange, Class, ClassSummary, DifficultyAdjustment, MasteryLevel,
    NodeAnalytics, NodeProgress, NodeStatus, PathAnalytics, School, SchoolOverview, SkillNode,
    Streak, StudentSnapshot, StudentTreeNode, Subject, SubjectProgress, TeacherDashboard,
    TreeNode, UserResponse, UserRole,
};
use crate::services::{
    AttemptOutcome, CalibrationReport, GamificationProfile, LeaderboardEntry, RegisteredSchool,
    SubjectProgressReport, TokenResponse, UnlockedNode,
};
use crate::types::PaginationMeta;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "LearnPath API",
        version = "0.1.0",
        description = "Schools, classes, skill trees, learning progress, gamification and analytics",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    paths(
        auth_handler::register_school,
        auth_handler::login,
        user_handler::get_current_user,
        user_handler::create_member,
        user_handler::list_members,
        user_handler::get_member,
        user_handler::update_member,
        user_handler::delete_member,
        user_handler::restore_member,
        school_handler::get_school,
        school_handler::update_school,
        class_handler::create_class,
        class_handler::list_classes,
        class_handler::get_class,
        class_handler::update_class,
        class_handler::delete_class,
        class_handler::assign_teacher,
        class_handler::list_students,
        class_handler::enroll_students,
        class_handler::remove_student,
        subject_handler::create_subject,
        subject_handler::list_subjects,
        subject_handler::get_subject,
        subject_handler::update_subject,
        subject_handler::delete_subject,
        skill_tree_handler::get_tree,
        skill_tree_handler::get_student_tree,
        skill_tree_handler::create_node,
        skill_tree_handler::calibrate_subject,
        skill_tree_handler::get_node,
        skill_tree_handler::update_node,
        skill_tree_handler::delete_node,
        progress_handler::submit_attempt,
        progress_handler::all_progress,
        progress_handler::subject_progress,
        gamification_handler::get_profile,
        gamification_handler::get_leaderboard,
        analytics_handler::school_overview,
        analytics_handler::teacher_dashboard,
        analytics_handler::path_analytics,
        chat_handler::send_message,
        chat_handler::get_history,
        chat_handler::clear_history,
    ),
    components(
        schemas(
            // Members
            UserRole,
            UserResponse,
            PaginationMeta,
            user_handler::CreateMemberRequest,
            user_handler::UpdateMemberRequest,
            user_handler::MemberPage,
            // Auth
            auth_handler::RegisterSchoolRequest,
            auth_handler::LoginRequest,
            TokenResponse,
            RegisteredSchool,
            // School structure
            School,
            Class,
            Subject,
            school_handler::UpdateSchoolRequest,
            class_handler::CreateClassRequest,
            class_handler::UpdateClassRequest,
            class_handler::AssignTeacherRequest,
            class_handler::EnrollStudentsRequest,
            subject_handler::CreateSubjectRequest,
            subject_handler::UpdateSubjectRequest,
            // Skill tree
            SkillNode,
            TreeNode,
            StudentTreeNode,
            NodeStatus,
            DifficultyAdjustment,
            CalibrationReport,
            skill_tree_handler::CreateNodeRequest,
            skill_tree_handler::UpdateNodeRequest,
            skill_tree_handler::CalibrateRequest,
            // Progress
            NodeProgress,
            SubjectProgress,
            MasteryLevel,
            SubjectProgressReport,
            AttemptOutcome,
            UnlockedNode,
            progress_handler::SubmitAttemptRequest,
            // Gamification
            Streak,
            AchievementView,
            GamificationProfile,
            LeaderboardEntry,
            // Analytics
            ClassSummary,
            SchoolOverview,
            StudentSnapshot,
            TeacherDashboard,
            NodeAnalytics,
            PathAnalytics,
            // Chat
            ChatExchange,
            chat_handler::SendMessageRequest,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "School sign-up and login"),
        (name = "Users", description = "Owners, teachers and students of a school"),
        (name = "School", description = "The caller's school"),
        (name = "Classes", description = "Classes and enrollment"),
        (name = "Subjects", description = "Subjects taught in the school"),
        (name = "Skill tree", description = "Skill nodes and their prerequisites"),
        (name = "Progress", description = "Attempts and mastery"),
        (name = "Gamification", description = "XP, streaks, achievements and leaderboards"),
        (name = "Analytics", description = "School, teacher and learning path reports"),
        (name = "Chat", description = "Tutor chat")
    )
)]
pub struct ApiDoc;

/// Security scheme modifier for JWT Bearer authentication
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT token obtained from /auth/login"))
                        .build(),
                ),
            );
        }
    }
}
