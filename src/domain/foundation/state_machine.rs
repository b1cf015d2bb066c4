//! Status lifecycles with checked transitions.

use super::ValidationError;

/// A status enum whose allowed moves are declared once.
///
/// `transition_to` rejects anything `can_transition_to` does not allow,
/// so callers never assign a status field directly.
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    fn can_transition_to(&self, target: &Self) -> bool;

    fn valid_transitions(&self) -> Vec<Self>;

    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if !self.can_transition_to(&target) {
            return Err(ValidationError::invalid_format(
                "status",
                format!("{:?} cannot move to {:?}", self, target),
            ));
        }
        Ok(target)
    }

    /// No outgoing moves remain.
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
