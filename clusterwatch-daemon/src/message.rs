//! Notification message formatting

use clusterwatch_common::Transition;
use serde::{Deserialize, Serialize};

/// Layout of notification message text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStyle {
    /// `event=changed cluster=<id> from=<old> to=<new>`, easy to parse downstream
    #[default]
    KeyValue,
    /// Plain English sentence
    Sentence,
}

/// Render a transition as notification text
pub fn format_transition(transition: &Transition, style: MessageStyle) -> String {
    match (style, transition) {
        (MessageStyle::KeyValue, Transition::Created { cluster, status }) => {
            format!("event=created cluster={} to={}", cluster, status)
        }
        (MessageStyle::KeyValue, Transition::Changed { cluster, from, to }) => {
            format!("event=changed cluster={} from={} to={}", cluster, from, to)
        }
        (MessageStyle::KeyValue, Transition::Deleted { cluster, last_status }) => {
            format!("event=deleted cluster={} from={}", cluster, last_status)
        }
        (MessageStyle::Sentence, Transition::Created { cluster, status }) => {
            format!("ECS Cluster {} has been created with status {}.", cluster, status)
        }
        (MessageStyle::Sentence, Transition::Changed { cluster, from, to }) => {
            format!("ECS Cluster {} status changed from {} to {}.", cluster, from, to)
        }
        (MessageStyle::Sentence, Transition::Deleted { cluster, .. }) => {
            format!("ECS Cluster {} has been deleted.", cluster)
        }
    }
}
