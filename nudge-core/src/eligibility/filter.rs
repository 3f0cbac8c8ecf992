//! Survey eligibility filtering
//!
//! The no-repeat rule (a survey the person already responded to is never
//! eligible) is always enforced here. Everything else about how often a
//! survey may come back is environment configuration and goes through a
//! [`RecontactPolicy`].

use chrono::{DateTime, Utc};

use crate::state::{DisplayOption, EnvironmentSnapshot, PersonSnapshot, Survey, SurveyId};

/// Inputs a recontact policy may consult
#[derive(Debug, Clone, Copy)]
pub struct PolicyContext<'a> {
    pub environment: &'a EnvironmentSnapshot,
    pub person: &'a PersonSnapshot,
    pub now: DateTime<Utc>,
}

/// Environment-defined frequency and targeting rules
pub trait RecontactPolicy: Send + Sync {
    /// Whether `survey` may be shown again given the person's history
    fn allows(&self, survey: &Survey, ctx: &PolicyContext<'_>) -> bool;
}

/// Applies display options, recontact days and segments as configured in the environment
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentPolicy;

impl EnvironmentPolicy {
    fn display_option_allows(survey: &Survey, person: &PersonSnapshot) -> bool {
        match survey.display_option {
            DisplayOption::RespondMultiple => true,
            DisplayOption::DisplayOnce => person.display_count(&survey.id) == 0,
            DisplayOption::DisplayMultiple => !person.has_responded(&survey.id),
            DisplayOption::DisplaySome => match survey.display_limit {
                None => true,
                Some(limit) => {
                    !person.has_responded(&survey.id)
                        && person.display_count(&survey.id) < limit as usize
                }
            },
        }
    }

    fn recontact_allows(survey: &Survey, ctx: &PolicyContext<'_>) -> bool {
        let Some(last) = ctx.person.last_display_at else {
            return true;
        };

        match survey
            .recontact_days
            .or(ctx.environment.product.recontact_days)
        {
            Some(days) => (ctx.now - last).num_days().abs() >= i64::from(days),
            None => true,
        }
    }

    fn segment_allows(survey: &Survey, person: &PersonSnapshot) -> bool {
        // Anonymous visitors are not segmented
        if person.user_id.is_none() {
            return true;
        }
        if person.segments.is_empty() {
            return false;
        }
        match &survey.segment {
            Some(segment) => person.segments.iter().any(|id| *id == segment.id),
            None => true,
        }
    }
}

impl RecontactPolicy for EnvironmentPolicy {
    fn allows(&self, survey: &Survey, ctx: &PolicyContext<'_>) -> bool {
        Self::display_option_allows(survey, ctx.person)
            && Self::recontact_allows(survey, ctx)
            && Self::segment_allows(survey, ctx.person)
    }
}

/// Policy that only relies on the no-repeat rule
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl RecontactPolicy for AllowAll {
    fn allows(&self, _survey: &Survey, _ctx: &PolicyContext<'_>) -> bool {
        true
    }
}

/// Ids of the catalog surveys currently eligible for `person`, in catalog order.
pub fn filter_surveys(
    environment: &EnvironmentSnapshot,
    person: &PersonSnapshot,
    policy: &dyn RecontactPolicy,
    now: DateTime<Utc>,
) -> Vec<SurveyId> {
    let ctx = PolicyContext {
        environment,
        person,
        now,
    };

    environment
        .surveys
        .iter()
        .filter(|survey| !person.has_responded(&survey.id))
        .filter(|survey| policy.allows(survey, &ctx))
        .map(|survey| survey.id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Segment;
    use chrono::Duration;

    fn survey(id: &str, option: DisplayOption) -> Survey {
        let mut survey = Survey::new(id, id);
        survey.display_option = option;
        survey
    }

    fn environment(surveys: Vec<Survey>) -> EnvironmentSnapshot {
        EnvironmentSnapshot {
            surveys,
            ..Default::default()
        }
    }

    #[test]
    fn responded_survey_is_never_eligible() {
        let env = environment(vec![
            survey("a", DisplayOption::RespondMultiple),
            survey("b", DisplayOption::DisplayMultiple),
        ]);
        let person = PersonSnapshot::default().with_response("a");

        for policy in [&EnvironmentPolicy as &dyn RecontactPolicy, &AllowAll] {
            let eligible = filter_surveys(&env, &person, policy, Utc::now());
            assert_eq!(eligible, vec!["b".to_string()]);
        }
    }

    #[test]
    fn filtering_is_pure() {
        let now = Utc::now();
        let env = environment(vec![
            survey("a", DisplayOption::DisplayOnce),
            survey("b", DisplayOption::DisplaySome),
        ]);
        let person = PersonSnapshot::default().with_display("a", now - Duration::days(3));

        let first = filter_surveys(&env, &person, &EnvironmentPolicy, now);
        let second = filter_surveys(&env, &person, &EnvironmentPolicy, now);
        assert_eq!(first, second);
    }

    #[test]
    fn display_once_excludes_displayed_survey() {
        let now = Utc::now();
        let env = environment(vec![
            survey("a", DisplayOption::DisplayOnce),
            survey("b", DisplayOption::DisplayOnce),
        ]);
        let person = PersonSnapshot::default().with_display("a", now);
        assert_eq!(
            filter_surveys(&env, &person, &EnvironmentPolicy, now),
            vec!["b".to_string()]
        );
    }

    #[test]
    fn display_some_respects_limit() {
        let now = Utc::now();
        let mut limited = survey("a", DisplayOption::DisplaySome);
        limited.display_limit = Some(2);
        let env = environment(vec![limited]);

        let once = PersonSnapshot::default().with_display("a", now);
        assert_eq!(filter_surveys(&env, &once, &EnvironmentPolicy, now).len(), 1);

        let twice = once.with_display("a", now);
        assert!(filter_surveys(&env, &twice, &EnvironmentPolicy, now).is_empty());
    }

    #[test]
    fn survey_recontact_days_take_precedence() {
        let now = Utc::now();
        let mut patient = survey("a", DisplayOption::DisplayMultiple);
        patient.recontact_days = Some(7);
        let mut env = environment(vec![patient, survey("b", DisplayOption::DisplayMultiple)]);
        env.product.recontact_days = Some(1);

        let person = PersonSnapshot::default().with_display("x", now - Duration::days(3));
        assert_eq!(
            filter_surveys(&env, &person, &EnvironmentPolicy, now),
            vec!["b".to_string()]
        );
    }

    #[test]
    fn no_recontact_rule_means_eligible() {
        let now = Utc::now();
        let env = environment(vec![survey("a", DisplayOption::DisplayMultiple)]);
        let person = PersonSnapshot::default().with_display("x", now);
        assert_eq!(filter_surveys(&env, &person, &EnvironmentPolicy, now).len(), 1);
    }

    #[test]
    fn identified_person_without_segments_sees_nothing() {
        let env = environment(vec![survey("a", DisplayOption::DisplayMultiple)]);
        let person = PersonSnapshot {
            user_id: Some("u1".to_string()),
            ..Default::default()
        };
        assert!(filter_surveys(&env, &person, &EnvironmentPolicy, Utc::now()).is_empty());
    }

    #[test]
    fn segmented_survey_requires_membership() {
        let mut targeted = survey("a", DisplayOption::DisplayMultiple);
        targeted.segment = Some(Segment {
            id: "beta".to_string(),
        });
        let env = environment(vec![targeted, survey("b", DisplayOption::DisplayMultiple)]);
        let person = PersonSnapshot {
            user_id: Some("u1".to_string()),
            segments: vec!["paying".to_string()],
            ..Default::default()
        };
        assert_eq!(
            filter_surveys(&env, &person, &EnvironmentPolicy, Utc::now()),
            vec!["b".to_string()]
        );
    }
}
