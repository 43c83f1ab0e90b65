//! The curriculum aggregate as the browser wizard stores it.
//!
//! Flat value objects, camelCase on the wire. Every field defaults so a
//! half-filled wizard still deserializes, and the level/status enums map
//! unrecognized spellings to `Unspecified` instead of rejecting the payload.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CurriculumData {
    pub personal_info: PersonalInfo,
    pub professional_objective: ProfessionalObjective,
    pub education: Vec<Education>,
    pub experience: Vec<Experience>,
    pub skills: Vec<Skill>,
    pub languages: Vec<Language>,
    pub courses: Vec<Course>,
    pub projects: Vec<Project>,
    pub achievements: Vec<Achievement>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalInfo {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub linkedin: String,
    pub github: String,
    pub website: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfessionalObjective {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EducationStatus {
    #[default]
    Completed,
    InProgress,
    Interrupted,
    /// Anything the wizard stored that is not one of the above, blanks included.
    #[serde(other)]
    Unspecified,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Education {
    pub id: String,
    pub institution: String,
    pub degree: String,
    pub field_of_study: String,
    pub start_date: String,
    pub end_date: String,
    pub status: EducationStatus,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Experience {
    pub id: String,
    pub company: String,
    pub position: String,
    pub start_date: String,
    pub end_date: String,
    pub current: bool,
    pub description: String,
    pub achievements: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillLevel {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
    Expert,
    #[serde(other)]
    Unspecified,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Skill {
    pub id: String,
    pub name: String,
    pub level: SkillLevel,
    pub category: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageProficiency {
    #[default]
    Basic,
    Intermediate,
    Advanced,
    Fluent,
    Native,
    #[serde(other)]
    Unspecified,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Language {
    pub id: String,
    pub name: String,
    pub proficiency: LanguageProficiency,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Course {
    pub id: String,
    pub name: String,
    pub institution: String,
    pub completion_date: String,
    pub hours: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: String,
    pub technologies: Vec<String>,
    pub link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Achievement {
    pub id: String,
    pub title: String,
    pub description: String,
    pub date: String,
}

impl CurriculumData {
    /// True when the wizard has not captured anything a prompt could use.
    pub fn is_blank(&self) -> bool {
        self.personal_info.full_name.trim().is_empty()
            && self.professional_objective.title.trim().is_empty()
            && self.professional_objective.description.trim().is_empty()
            && self.education.is_empty()
            && self.experience.is_empty()
            && self.skills.is_empty()
            && self.projects.is_empty()
    }

    /// Most recent role first: current positions, then wizard order.
    pub fn experience_by_recency(&self) -> Vec<&Experience> {
        let mut roles: Vec<&Experience> = self.experience.iter().collect();
        roles.sort_by_key(|e| !e.current);
        roles
    }

    pub fn skill_names(&self) -> Vec<&str> {
        self.skills
            .iter()
            .map(|s| s.name.trim())
            .filter(|n| !n.is_empty())
            .collect()
    }
}
