use crate::model::{
    Project, ProjectId, ProjectPriority, ProjectStatus, User, UserId, UserRole, UserStatus,
};
use chrono::NaiveDate;
use indexmap::IndexSet;

pub const DEFAULT_AVATAR: &str = "https://images.pexels.com/photos/774909/pexels-photo-774909.jpeg?auto=compress&cs=tinysrgb&w=100&h=100&fit=crop";

fn avatar(photo: u32) -> Option<String> {
    Some(format!(
        "https://images.pexels.com/photos/{photo}/pexels-photo-{photo}.jpeg?auto=compress&cs=tinysrgb&w=100&h=100&fit=crop"
    ))
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

fn members(ids: &[&str]) -> IndexSet<UserId> {
    ids.iter().map(|id| UserId::from(*id)).collect()
}

fn tags(values: &[&str]) -> IndexSet<String> {
    values.iter().map(|tag| (*tag).to_string()).collect()
}

pub fn users() -> Vec<User> {
    vec![
        User {
            id: UserId::from("1"),
            name: "Sarah Johnson".to_string(),
            email: "sarah.johnson@company.com".to_string(),
            avatar: avatar(774909),
            role: UserRole::Admin,
            department: "Engineering".to_string(),
            join_date: ymd(2023, 1, 15),
            status: UserStatus::Active,
            projects_count: 5,
        },
        User {
            id: UserId::from("2"),
            name: "Michael Chen".to_string(),
            email: "michael.chen@company.com".to_string(),
            avatar: avatar(697509),
            role: UserRole::Developer,
            department: "Engineering".to_string(),
            join_date: ymd(2023, 3, 22),
            status: UserStatus::Active,
            projects_count: 3,
        },
        User {
            id: UserId::from("3"),
            name: "Emily Rodriguez".to_string(),
            email: "emily.rodriguez@company.com".to_string(),
            avatar: avatar(733872),
            role: UserRole::Designer,
            department: "Design".to_string(),
            join_date: ymd(2023, 2, 10),
            status: UserStatus::Active,
            projects_count: 4,
        },
        User {
            id: UserId::from("4"),
            name: "David Kim".to_string(),
            email: "david.kim@company.com".to_string(),
            avatar: avatar(846741),
            role: UserRole::Manager,
            department: "Product".to_string(),
            join_date: ymd(2022, 11, 5),
            status: UserStatus::Active,
            projects_count: 7,
        },
    ]
}

pub fn projects() -> Vec<Project> {
    vec![
        Project {
            id: ProjectId::from("1"),
            name: "E-commerce Platform Redesign".to_string(),
            description: "Complete overhaul of the customer-facing e-commerce platform with modern UI/UX".to_string(),
            status: ProjectStatus::InProgress,
            priority: ProjectPriority::High,
            start_date: ymd(2024, 1, 15),
            end_date: ymd(2024, 6, 30),
            progress: 65,
            team_members: members(&["1", "2", "3"]),
            budget: 150_000.0,
            tags: tags(&["frontend", "design", "react"]),
        },
        Project {
            id: ProjectId::from("2"),
            name: "Mobile App Development".to_string(),
            description: "Native mobile application for iOS and Android platforms".to_string(),
            status: ProjectStatus::Planning,
            priority: ProjectPriority::Medium,
            start_date: ymd(2024, 3, 1),
            end_date: ymd(2024, 12, 15),
            progress: 15,
            team_members: members(&["2", "4"]),
            budget: 200_000.0,
            tags: tags(&["mobile", "ios", "android"]),
        },
        Project {
            id: ProjectId::from("3"),
            name: "Data Analytics Dashboard".to_string(),
            description: "Internal analytics dashboard for business intelligence and reporting".to_string(),
            status: ProjectStatus::Completed,
            priority: ProjectPriority::Medium,
            start_date: ymd(2023, 9, 1),
            end_date: ymd(2024, 1, 30),
            progress: 100,
            team_members: members(&["1", "4"]),
            budget: 80_000.0,
            tags: tags(&["analytics", "dashboard", "data"]),
        },
        Project {
            id: ProjectId::from("4"),
            name: "API Integration System".to_string(),
            description: "Microservices architecture for third-party API integrations".to_string(),
            status: ProjectStatus::Review,
            priority: ProjectPriority::High,
            start_date: ymd(2024, 2, 1),
            end_date: ymd(2024, 5, 15),
            progress: 85,
            team_members: members(&["1", "2"]),
            budget: 120_000.0,
            tags: tags(&["backend", "api", "microservices"]),
        },
    ]
}
