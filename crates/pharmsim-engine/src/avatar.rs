//! Demographics to persona mapping.

use pharmsim_contracts::avatar::{AgeBracket, AvatarId, PatientAvatar, PresentationGender};
use pharmsim_contracts::case::PatientProfile;
use pharmsim_contracts::labels::Gender;

/// Deterministic avatar selection. `Other` renders with one configured
/// presentation gender.
#[derive(Debug, Clone, Copy)]
pub struct AvatarPicker {
    other_gender: PresentationGender,
}

impl AvatarPicker {
    pub fn new(other_gender: PresentationGender) -> Self {
        Self { other_gender }
    }

    pub fn presentation_gender(&self, gender: Gender) -> PresentationGender {
        match gender {
            Gender::Male => PresentationGender::Male,
            Gender::Female => PresentationGender::Female,
            Gender::Other => self.other_gender,
        }
    }

    pub fn pick_avatar(&self, profile: &PatientProfile) -> PatientAvatar {
        let gender = self.presentation_gender(profile.gender);
        PatientAvatar {
            avatar_identifier: Some(AvatarId::new(AgeBracket::for_age(profile.age), gender)),
            gender,
        }
    }
}

impl Default for AvatarPicker {
    fn default() -> Self {
        Self::new(PresentationGender::Female)
    }
}

/// Rebuild an avatar from a stored identifier. Identifiers outside the
/// catalog select the generic presentation.
pub fn avatar_from_identifier(identifier: Option<&str>, gender: PresentationGender) -> PatientAvatar {
    PatientAvatar {
        avatar_identifier: identifier.and_then(AvatarId::from_identifier),
        gender,
    }
}
