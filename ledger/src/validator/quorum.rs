//! Multi-validator consensus: N independent decisions, majority vote,
//! INVALID wins ties.

use crate::types::Decision;

use super::{DecisionRequest, ValidationRecord, ValidatorPort};
use crate::error::ErrorKind;

/// Runs `members` independently and combines their decisions by majority
/// vote; a tie (including a 2-way tie among 3 distinct decisions) favors
/// `INVALID`.
///
/// A constituent call that itself errors (e.g. `ValidatorTransient` after
/// its own retries are exhausted) aborts quorum formation: the error is
/// propagated rather than treated as a vote.
pub struct QuorumValidator<V> {
    members: Vec<V>,
}

impl<V> QuorumValidator<V> {
    pub fn new(members: Vec<V>) -> Self {
        assert!(!members.is_empty(), "quorum requires at least one member");
        Self { members }
    }
}

fn tally(records: &[ValidationRecord]) -> Decision {
    let mut valid = 0;
    let mut needs_clarification = 0;
    let mut invalid = 0;
    for r in records {
        match r.decision {
            Decision::Valid => valid += 1,
            Decision::NeedsClarification => needs_clarification += 1,
            Decision::Invalid => invalid += 1,
        }
    }

    let max = valid.max(needs_clarification).max(invalid);
    let winners = [
        (Decision::Valid, valid == max),
        (Decision::NeedsClarification, needs_clarification == max),
        (Decision::Invalid, invalid == max),
    ];
    let winner_count = winners.iter().filter(|(_, is_max)| *is_max).count();
    if winner_count > 1 {
        Decision::Invalid
    } else {
        winners.into_iter().find(|(_, is_max)| *is_max).unwrap().0
    }
}

impl<V> ValidatorPort for QuorumValidator<V>
where
    V: ValidatorPort,
{
    fn decide(&self, request: &DecisionRequest) -> Result<ValidationRecord, ErrorKind> {
        let mut records = Vec::with_capacity(self.members.len());
        for member in &self.members {
            records.push(member.decide(request)?);
        }

        let winning_decision = tally(&records);
        let representative = records
            .iter()
            .find(|r| r.decision == winning_decision)
            .cloned()
            .expect("winning decision is always present among tallied records");

        Ok(ValidationRecord {
            decision: winning_decision,
            paraphrase: representative.paraphrase,
            reasoning: format!(
                "quorum of {} ({})",
                records.len(),
                representative.reasoning
            ),
            validator_id: "quorum".to_string(),
            model_version: representative.model_version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::plain_record;

    struct FixedValidator(Decision);

    impl ValidatorPort for FixedValidator {
        fn decide(&self, _request: &DecisionRequest) -> Result<ValidationRecord, ErrorKind> {
            Ok(plain_record(self.0, "p", "r", "fixed", "v1"))
        }
    }

    fn request() -> DecisionRequest {
        DecisionRequest {
            content: "c".into(),
            intent: "i".into(),
            author: "a".into(),
        }
    }

    #[test]
    fn majority_decision_wins() {
        let q = QuorumValidator::new(vec![
            FixedValidator(Decision::Valid),
            FixedValidator(Decision::Valid),
            FixedValidator(Decision::Invalid),
        ]);
        let record = q.decide(&request()).unwrap();
        assert_eq!(record.decision, Decision::Valid);
    }

    #[test]
    fn tie_favors_invalid() {
        let q = QuorumValidator::new(vec![
            FixedValidator(Decision::Valid),
            FixedValidator(Decision::Invalid),
        ]);
        let record = q.decide(&request()).unwrap();
        assert_eq!(record.decision, Decision::Invalid);
    }

    #[test]
    fn three_way_tie_favors_invalid() {
        let q = QuorumValidator::new(vec![
            FixedValidator(Decision::Valid),
            FixedValidator(Decision::NeedsClarification),
            FixedValidator(Decision::Invalid),
        ]);
        let record = q.decide(&request()).unwrap();
        assert_eq!(record.decision, Decision::Invalid);
    }

    #[test]
    fn single_member_quorum_mirrors_that_member() {
        let q = QuorumValidator::new(vec![FixedValidator(Decision::NeedsClarification)]);
        let record = q.decide(&request()).unwrap();
        assert_eq!(record.decision, Decision::NeedsClarification);
    }
}
