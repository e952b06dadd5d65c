//! Adaptive sequencer — picks and orders the steps for one tour run.
//!
//! `select_steps` is a pure function of the profile and the catalog:
//!
//! 1. Start from catalog order.
//! 2. Re-sort by the user's stated goal and urgency (one composite key).
//! 3. Drop completed steps.
//! 4. Drop steps whose conditional-skip answer is already given.
//! 5. Put `welcome` back at the front and `final-connection` at the end if
//!    filtering removed them.
//! 6. Truncate to `max_steps`, never dropping those two anchors.

use crate::config::{OrderingPolicy, TourConfig};

use super::catalog::{StepCatalog, ids, triggers};
use super::model::{UserProfile, fields};
use super::step::{StepCategory, TourStep};

/// Knobs for step selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectOptions {
    pub max_steps: usize,
    pub ordering: OrderingPolicy,
}

impl Default for SelectOptions {
    fn default() -> Self {
        Self::from(&TourConfig::default())
    }
}

impl From<&TourConfig> for SelectOptions {
    fn from(config: &TourConfig) -> Self {
        Self {
            max_steps: config.max_steps,
            ordering: config.ordering,
        }
    }
}

/// What the profile says about the user's intent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Intent {
    investment: bool,
    urgent: bool,
}

impl Intent {
    fn of(profile: &UserProfile) -> Self {
        let progress = &profile.tour_progress;
        Self {
            investment: progress.preference_is(fields::PRIMARY_GOAL, triggers::INVESTMENT_GOAL),
            urgent: progress.preference_is(fields::TIMELINE, triggers::URGENT_TIMELINE),
        }
    }

    fn any(&self) -> bool {
        self.investment || self.urgent
    }
}

/// Select the ordered, filtered, length-capped steps for a run.
pub fn select_steps(
    profile: &UserProfile,
    catalog: &StepCatalog,
    options: SelectOptions,
) -> Vec<TourStep> {
    let intent = Intent::of(profile);
    let progress = &profile.tour_progress;

    let mut keyed: Vec<(Vec<i64>, &TourStep)> = catalog
        .steps()
        .iter()
        .map(|step| (sort_key(step, intent, options.ordering), step))
        .collect();
    // Stable: steps with equal keys keep catalog order.
    keyed.sort_by(|a, b| a.0.cmp(&b.0));

    let mut steps: Vec<TourStep> = keyed
        .into_iter()
        .map(|(_, step)| step)
        .filter(|step| !profile.has_completed(&step.id))
        .filter(|step| match step.conditional_logic {
            Some(ref logic) => !logic.triggered_by(progress.preference(&logic.based_on)),
            None => true,
        })
        .cloned()
        .collect();

    if let Some(welcome) = catalog.get(ids::WELCOME) {
        if !steps.iter().any(|s| s.id == ids::WELCOME) {
            steps.insert(0, welcome.clone());
        }
    }
    if let Some(last) = catalog.get(ids::FINAL_CONNECTION) {
        if !steps.iter().any(|s| s.id == ids::FINAL_CONNECTION) {
            steps.push(last.clone());
        }
    }

    truncate_keeping_anchors(steps, options.max_steps)
}

/// Re-derive the steps after `index` for a run already in progress.
///
/// Steps `0..=index` are kept as they are so the current position stays
/// valid; the rest comes from a fresh selection for the updated profile.
pub fn replan(
    current: &[TourStep],
    index: usize,
    profile: &UserProfile,
    catalog: &StepCatalog,
    options: SelectOptions,
) -> Vec<TourStep> {
    let visited = &current[..(index + 1).min(current.len())];
    let fresh = select_steps(
        profile,
        catalog,
        SelectOptions {
            max_steps: usize::MAX,
            ..options
        },
    );

    let mut steps = visited.to_vec();
    steps.extend(
        fresh
            .into_iter()
            .filter(|step| !visited.iter().any(|v| v.id == step.id)),
    );
    truncate_keeping_anchors(steps, options.max_steps.max(visited.len()))
}

/// Composite sort key; lower sorts first.
///
/// Under `LastRuleWins` the urgency ordering is the primary key and the
/// investment ordering only breaks its ties, which is what applying the
/// investment sort and then the urgency sort in sequence produces.
fn sort_key(step: &TourStep, intent: Intent, ordering: OrderingPolicy) -> Vec<i64> {
    let not_action = rank(step.category != StepCategory::Action);
    let not_investment = rank(step.id != ids::INVESTMENT_FOCUS);
    let not_personal = rank(step.category != StepCategory::Personalization);
    let priority = -i64::from(step.priority);

    let mut key = Vec::with_capacity(5);
    match ordering {
        OrderingPolicy::LastRuleWins => {
            if intent.urgent {
                key.extend([not_action, priority]);
            }
            if intent.investment {
                key.extend([not_investment, not_personal, priority]);
            }
        }
        OrderingPolicy::Blended => {
            if intent.urgent {
                key.push(not_action);
            }
            if intent.investment {
                key.extend([not_investment, not_personal]);
            }
            if intent.any() {
                key.push(priority);
            }
        }
    }
    key
}

fn rank(flag: bool) -> i64 {
    i64::from(flag)
}

fn is_anchor(step: &TourStep) -> bool {
    step.id == ids::WELCOME || step.id == ids::FINAL_CONNECTION
}

fn truncate_keeping_anchors(mut steps: Vec<TourStep>, max: usize) -> Vec<TourStep> {
    if steps.len() <= max {
        return steps;
    }
    let anchors = steps.iter().filter(|s| is_anchor(s)).count();
    if anchors >= max {
        steps.truncate(max);
        return steps;
    }

    let mut room = max - anchors;
    steps
        .into_iter()
        .filter(|step| {
            if is_anchor(step) {
                true
            } else if room > 0 {
                room -= 1;
                true
            } else {
                false
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tour::model::Answer;

    fn ids_of(steps: &[TourStep]) -> Vec<&str> {
        steps.iter().map(|s| s.id.as_str()).collect()
    }

    fn select(profile: &UserProfile) -> Vec<TourStep> {
        select_steps(profile, &StepCatalog::default(), SelectOptions::default())
    }

    fn uncapped(ordering: OrderingPolicy) -> SelectOptions {
        SelectOptions {
            max_steps: 100,
            ordering,
        }
    }

    fn investor() -> UserProfile {
        UserProfile::default().with_answer(fields::PRIMARY_GOAL, "Making an investment".into())
    }

    fn urgent() -> UserProfile {
        UserProfile::default().with_answer(fields::TIMELINE, "Immediately (within 3 months)".into())
    }

    #[test]
    fn fresh_profile_starts_with_welcome_and_ends_with_final() {
        let steps = select(&UserProfile::default());
        assert_eq!(
            ids_of(&steps),
            vec![
                "welcome",
                "primary-goal",
                "timeline",
                "experience",
                "property-types",
                "budget",
                "smart-search",
                "final-connection",
            ]
        );
    }

    #[test]
    fn selection_is_deterministic() {
        let profile = investor()
            .with_answer(fields::TIMELINE, "Immediately (within 3 months)".into())
            .with_completed_steps(["budget"]);
        assert_eq!(select(&profile), select(&profile));
    }

    #[test]
    fn investment_goal_puts_investment_focus_first() {
        let steps = select(&investor());
        assert_eq!(
            ids_of(&steps),
            vec![
                "investment-focus",
                "saved-favorites",
                "welcome",
                "primary-goal",
                "timeline",
                "experience",
                "property-types",
                "final-connection",
            ]
        );
    }

    #[test]
    fn urgent_timeline_puts_actions_first() {
        let steps = select(&urgent());
        assert_eq!(steps[0].id, "schedule-viewing");
        assert_eq!(steps[1].id, "final-connection");
        assert_eq!(steps[2].id, "welcome");
        assert_eq!(steps.len(), 8);
    }

    #[test]
    fn urgency_wins_over_investment_by_default() {
        let profile = investor()
            .with_answer(fields::TIMELINE, "Immediately (within 3 months)".into());
        let steps = select_steps(
            &profile,
            &StepCatalog::default(),
            uncapped(OrderingPolicy::LastRuleWins),
        );
        let ids = ids_of(&steps);

        assert_eq!(&ids[..3], &["schedule-viewing", "final-connection", "welcome"]);
        // Investment ordering survives only as a tiebreak among equal priorities.
        let focus = ids.iter().position(|id| *id == "investment-focus").unwrap();
        let guide = ids.iter().position(|id| *id == "first-time-buyer").unwrap();
        assert!(focus > 3);
        assert_eq!(focus + 1, guide);
    }

    #[test]
    fn blended_ordering_combines_intents() {
        let profile = investor()
            .with_answer(fields::TIMELINE, "Immediately (within 3 months)".into());
        let steps = select_steps(
            &profile,
            &StepCatalog::default(),
            uncapped(OrderingPolicy::Blended),
        );
        assert_eq!(
            &ids_of(&steps)[..5],
            &[
                "schedule-viewing",
                "final-connection",
                "investment-focus",
                "saved-favorites",
                "welcome"
            ]
        );
    }

    #[test]
    fn completed_steps_are_excluded() {
        let profile = UserProfile::default().with_completed_steps(["primary-goal", "timeline"]);
        let steps = select(&profile);
        let ids = ids_of(&steps);
        assert!(!ids.contains(&"primary-goal"));
        assert!(!ids.contains(&"timeline"));
        assert!(ids.contains(&"neighborhoods"));
    }

    #[test]
    fn completed_anchors_are_forced_back() {
        let profile = investor().with_completed_steps(["welcome", "final-connection"]);
        let steps = select(&profile);
        assert_eq!(steps[0].id, "welcome");
        assert_eq!(steps[1].id, "investment-focus");
        assert_eq!(steps.last().unwrap().id, "final-connection");
    }

    #[test]
    fn conditional_skip_removes_step_when_answer_matches() {
        let options = uncapped(OrderingPolicy::LastRuleWins);
        let catalog = StepCatalog::default();

        let first_home =
            UserProfile::default().with_answer(fields::PRIMARY_GOAL, "Buying my first home".into());
        assert!(
            !select_steps(&first_home, &catalog, options)
                .iter()
                .any(|s| s.id == "luxury-collection")
        );

        let upgrading = UserProfile::default()
            .with_answer(fields::PRIMARY_GOAL, "Upgrading to a luxury property".into());
        assert!(
            select_steps(&upgrading, &catalog, options)
                .iter()
                .any(|s| s.id == "luxury-collection")
        );

        let unset = UserProfile::default();
        assert!(
            select_steps(&unset, &catalog, options)
                .iter()
                .any(|s| s.id == "luxury-collection")
        );
    }

    #[test]
    fn skip_target_is_not_inserted() {
        let mut steps = vec![
            TourStep::new("welcome", StepCategory::Welcome, 10, "Hi"),
            TourStep::new("branch", StepCategory::Discovery, 5, "Branch")
                .skip_when("goal", Answer::from("x")),
            TourStep::new("final-connection", StepCategory::Action, 1, "Bye"),
        ];
        if let Some(ref mut logic) = steps[1].conditional_logic {
            logic.skip_to_step_id = Some("elsewhere".to_string());
        }
        let catalog = StepCatalog::new(steps).unwrap();
        let profile = UserProfile::default().with_answer("goal", "x".into());

        let selected = select_steps(&profile, &catalog, SelectOptions::default());
        assert_eq!(ids_of(&selected), vec!["welcome", "final-connection"]);
    }

    #[test]
    fn length_stays_between_two_and_eight() {
        let catalog = StepCatalog::default();
        let all: Vec<String> = catalog.steps().iter().map(|s| s.id.clone()).collect();

        let profiles = [
            UserProfile::default(),
            investor(),
            urgent(),
            UserProfile::default().with_completed_steps(all.clone()),
            investor().with_completed_steps(all[3..].to_vec()),
        ];
        for profile in &profiles {
            let steps = select_steps(profile, &catalog, SelectOptions::default());
            assert!(steps.len() >= 2, "too few: {:?}", ids_of(&steps));
            assert!(steps.len() <= 8, "too many: {:?}", ids_of(&steps));
            assert!(steps.iter().any(|s| s.id == "welcome"));
            assert!(steps.iter().any(|s| s.id == "final-connection"));
        }
    }

    #[test]
    fn everything_completed_leaves_only_anchors() {
        let catalog = StepCatalog::default();
        let all: Vec<String> = catalog.steps().iter().map(|s| s.id.clone()).collect();
        let profile = UserProfile::default().with_completed_steps(all);
        let steps = select_steps(&profile, &catalog, SelectOptions::default());
        assert_eq!(ids_of(&steps), vec!["welcome", "final-connection"]);
    }

    #[test]
    fn replan_keeps_visited_prefix_and_reorders_the_rest() {
        let catalog = StepCatalog::default();
        let fresh = UserProfile::default();
        let run = select_steps(&fresh, &catalog, SelectOptions::default());
        assert_eq!(run[1].id, "primary-goal");

        let answered = fresh.with_answer(fields::PRIMARY_GOAL, "Making an investment".into());
        let replanned = replan(&run, 1, &answered, &catalog, SelectOptions::default());
        assert_eq!(
            ids_of(&replanned),
            vec![
                "welcome",
                "primary-goal",
                "investment-focus",
                "saved-favorites",
                "timeline",
                "experience",
                "property-types",
                "final-connection",
            ]
        );
    }

    #[test]
    fn replan_drops_newly_skipped_upcoming_steps() {
        let catalog = StepCatalog::default();
        let options = uncapped(OrderingPolicy::LastRuleWins);
        let run = select_steps(&UserProfile::default(), &catalog, options);
        assert!(run.iter().any(|s| s.id == "luxury-collection"));

        let answered =
            UserProfile::default().with_answer(fields::PRIMARY_GOAL, "Buying my first home".into());
        let replanned = replan(&run, 1, &answered, &catalog, options);
        assert!(!replanned.iter().any(|s| s.id == "luxury-collection"));
        assert_eq!(&replanned[..2], &run[..2]);
    }

    #[test]
    fn catalog_without_anchors_is_not_padded() {
        let catalog = StepCatalog::new(vec![TourStep::new(
            "solo",
            StepCategory::Discovery,
            1,
            "Solo",
        )])
        .unwrap();
        let steps = select_steps(&UserProfile::default(), &catalog, SelectOptions::default());
        assert_eq!(ids_of(&steps), vec!["solo"]);

        let done = UserProfile::default().with_completed_steps(["solo"]);
        assert!(select_steps(&done, &catalog, SelectOptions::default()).is_empty());
    }
}
