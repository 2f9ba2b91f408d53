//! Per-event decision state machine and tsunami escalation.
//!
//! `Detecting -> Computing -> Alerting | Dismissed`, with the tsunami warning
//! as an orthogonal sub-state reachable only from `Alerting`.

use crate::alarm::{self, priority_for, tsunami_priority};
use crate::{
    ActiveEvent, AlarmState, AlertFlags, Constants, Counters, EventPhase, EventType, Signal,
    SignalEnvelope,
};

/// Trigger count that must be exceeded before detection is confirmed.
pub fn detection_threshold(event: &ActiveEvent, constants: &Constants) -> u32 {
    if event.triggered_offshore > event.triggered_inland {
        constants.offshore_trigger_threshold
    } else {
        constants.inland_trigger_threshold
    }
}

pub fn meets_alert_criteria(event: &ActiveEvent, constants: &Constants) -> bool {
    event.tsunami_risk
        || event.magnitude >= constants.alert_magnitude
        || (event.magnitude >= constants.moderate_alert_magnitude
            && event.max_local_intensity >= constants.moderate_alert_min_intensity)
        || event.event_type == EventType::Volcano
}

/// Shared, cross-event alert state the state machine writes to.
pub(crate) struct AlertContext<'a> {
    pub alerts: &'a mut AlertFlags,
    pub alarm: &'a mut AlarmState,
    pub counters: &'a mut Counters,
    pub signals: &'a mut Vec<SignalEnvelope>,
}

pub(crate) fn advance_phase(
    event: &mut ActiveEvent,
    now: f64,
    constants: &Constants,
    ctx: &mut AlertContext<'_>,
) {
    if event.phase == EventPhase::Detecting
        && event.total_triggers() > detection_threshold(event, constants)
    {
        event.first_trigger_time = Some(now);
        event.phase = EventPhase::Computing;
        ctx.signals.push(crate::emit(
            ctx.counters,
            now,
            Signal::DetectionConfirmed {
                event_id: event.id.clone(),
                triggers: event.total_triggers(),
            },
        ));
    }

    if event.phase == EventPhase::Computing {
        let ready = event
            .first_trigger_time
            .is_some_and(|first| now - first >= event.processing_delay);
        if ready {
            decide(event, now, constants, ctx);
        }
    }

    if event.is_alerting() && event.tsunami_risk && !event.tsunami_alerted {
        let due = event
            .alert_time
            .is_some_and(|alerted| now - alerted >= event.tsunami_delay);
        if due {
            escalate_tsunami(event, now, constants, ctx);
        }
    }
}

fn decide(event: &mut ActiveEvent, now: f64, constants: &Constants, ctx: &mut AlertContext<'_>) {
    if !meets_alert_criteria(event, constants) {
        event.phase = EventPhase::Dismissed;
        ctx.signals.push(crate::emit(
            ctx.counters,
            now,
            Signal::AlertDismissed {
                event_id: event.id.clone(),
            },
        ));
        return;
    }

    event.phase = EventPhase::Alerting;
    event.alert_time = Some(now);
    ctx.alerts.main = true;
    if event.event_type == EventType::Volcano {
        ctx.alerts.volcano = true;
    }
    ctx.signals.push(crate::emit(
        ctx.counters,
        now,
        Signal::AlertIssued {
            event_id: event.id.clone(),
            event_type: event.event_type,
        },
    ));
    let outcome = alarm::sound(
        ctx.alarm,
        ctx.counters,
        ctx.alerts.volcano,
        &event.id,
        event.event_type,
        priority_for(event.event_type),
        now,
        constants.alarm_min_interval_s,
    );
    ctx.signals.push(outcome);
}

fn escalate_tsunami(
    event: &mut ActiveEvent,
    now: f64,
    constants: &Constants,
    ctx: &mut AlertContext<'_>,
) {
    event.tsunami_alerted = true;
    // The volcano banner takes the screen; the tsunami flag stays off while it is up.
    if !ctx.alerts.volcano {
        ctx.alerts.tsunami = true;
    }
    ctx.signals.push(crate::emit(
        ctx.counters,
        now,
        Signal::TsunamiAlertIssued {
            event_id: event.id.clone(),
        },
    ));
    let outcome = alarm::sound(
        ctx.alarm,
        ctx.counters,
        ctx.alerts.volcano,
        &event.id,
        event.event_type,
        tsunami_priority(event.event_type),
        now,
        constants.alarm_min_interval_s,
    );
    ctx.signals.push(outcome);
}
