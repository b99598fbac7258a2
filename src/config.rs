use chrono::NaiveDate;
use rusqlite::Connection;

use crate::db;

/// One entry of the fixed subject list. The color tag is presentation
/// metadata the frontend maps to its own palette.
#[derive(Clone, Debug)]
pub struct Subject {
    pub name: &'static str,
    pub color: &'static str,
}

const SUBJECTS: [Subject; 11] = [
    Subject { name: "Islamic Studies", color: "islamic" },
    Subject { name: "Arabic Language", color: "arabic" },
    Subject { name: "Social Studies", color: "social" },
    Subject { name: "Science", color: "science" },
    Subject { name: "Mathematics", color: "math" },
    Subject { name: "Art Education", color: "art" },
    Subject { name: "Physical Education", color: "physical" },
    Subject { name: "Family Education", color: "family" },
    Subject { name: "Digital Skills", color: "digital" },
    Subject { name: "Critical Thinking", color: "critical" },
    Subject { name: "English Language", color: "english" },
];

const GRADES: [&str; 3] = [
    "First Intermediate",
    "Second Intermediate",
    "Third Intermediate",
];

// Critical Thinking is only taught in the third grade.
const EXCLUDED_SUBJECT: &str = "Critical Thinking";
const EXCLUDED_GRADES: [&str; 2] = ["First Intermediate", "Second Intermediate"];

const DEFAULT_UPLOAD_PASSWORD: &str = "teacher2024";
const DEFAULT_DATE_EDIT_PASSWORD: &str = "dates2024";
const DEFAULT_TOTAL_WEEKS: i64 = 15;
const DEFAULT_SCHOOL_YEAR_START: &str = "2024-09-01";

#[derive(Clone, Debug)]
pub struct BoardConfig {
    pub upload_password: String,
    pub date_edit_password: String,
    pub subjects: Vec<Subject>,
    pub grades: Vec<&'static str>,
    pub total_weeks: i64,
    pub school_year_start: NaiveDate,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            upload_password: DEFAULT_UPLOAD_PASSWORD.to_string(),
            date_edit_password: DEFAULT_DATE_EDIT_PASSWORD.to_string(),
            subjects: SUBJECTS.to_vec(),
            grades: GRADES.to_vec(),
            total_weeks: DEFAULT_TOTAL_WEEKS,
            school_year_start: NaiveDate::parse_from_str(DEFAULT_SCHOOL_YEAR_START, "%Y-%m-%d")
                .expect("default school year start"),
        }
    }
}

impl BoardConfig {
    /// Defaults overlaid with the workspace's `setup.board` section.
    /// The subject and grade enumerations are curriculum, not
    /// deployment settings, and stay compiled in.
    pub fn load(conn: &Connection) -> Self {
        let mut cfg = Self::default();
        let Some(obj) = db::settings_get_json(conn, "setup.board")
            .ok()
            .flatten()
            .and_then(|v| v.as_object().cloned())
        else {
            return cfg;
        };
        if let Some(s) = obj.get("uploadPassword").and_then(|v| v.as_str()) {
            let s = s.trim();
            if !s.is_empty() {
                cfg.upload_password = s.to_string();
            }
        }
        if let Some(s) = obj.get("dateEditPassword").and_then(|v| v.as_str()) {
            let s = s.trim();
            if !s.is_empty() {
                cfg.date_edit_password = s.to_string();
            }
        }
        if let Some(n) = obj.get("totalWeeks").and_then(|v| v.as_i64()).filter(|n| *n > 0) {
            cfg.total_weeks = n;
        }
        if let Some(d) = obj
            .get("schoolYearStart")
            .and_then(|v| v.as_str())
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
        {
            cfg.school_year_start = d;
        }
        cfg
    }

    pub fn is_subject(&self, name: &str) -> bool {
        self.subjects.iter().any(|s| s.name == name)
    }

    pub fn is_grade(&self, name: &str) -> bool {
        self.grades.iter().any(|g| *g == name)
    }

    /// Whether the (subject, grade) cell exists on the board at all.
    pub fn offered(&self, subject: &str, grade: &str) -> bool {
        if !self.is_subject(subject) || !self.is_grade(grade) {
            return false;
        }
        !(subject == EXCLUDED_SUBJECT && EXCLUDED_GRADES.contains(&grade))
    }

    /// Cells a complete week requires: subjects x grades minus the
    /// excluded combinations.
    pub fn required_cells(&self) -> i64 {
        self.grades
            .iter()
            .map(|g| {
                self.subjects
                    .iter()
                    .filter(|s| self.offered(s.name, g))
                    .count() as i64
            })
            .sum()
    }
}
