//! Mapping of free-text role labels onto [`RoleCode`], and the youth-grade
//! blacklist applied to competition names.
use schedula_utils::regex;

use crate::schema::RoleCode;

impl RoleCode {
    /// First matching rule wins.  All patterns are anchored at the start of
    /// the label, so `"Senior Assessor"` is not an assessor role.
    pub fn classify(label: &str) -> RoleCode {
        if regex!(r"^A.*R.*1").is_match(label) {
            RoleCode::AssistantReferee1
        } else if regex!(r"^A.*R.*2").is_match(label) {
            RoleCode::AssistantReferee2
        } else if label.contains("Mentor") {
            RoleCode::Mentor
        } else if regex!(r"^R.*Assessor").is_match(label) {
            RoleCode::Assessor
        } else if label == "Referee" {
            RoleCode::Referee
        } else if label.contains('4') {
            RoleCode::FourthOfficial
        } else {
            RoleCode::Other
        }
    }
}

/// Youth age grades (U6 to U11, "Under 6" to "Under 11") are not appointed.
pub fn is_blacklisted(competition: &str) -> bool {
    regex!(r"^(U|Under.)(6|7|8|9|10|11)").is_match(competition)
}
