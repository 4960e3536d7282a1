mod common;

use assert_matches::assert_matches;

use agenda_core::appointment_status::AppointmentStatus;
use agenda_core::error::CoreError;
use agenda_core::schedule::ScheduleScope;
use agenda_engine::AppointmentPatch;
use common::{closed_on, fixture, monday, request, t, weekly, ORG_ID};

// ---------------------------------------------------------------------------
// Time changes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reschedule_into_free_slot() {
    let fx = fixture();
    let appt = fx
        .engine
        .book_appointment(request(fx.member.id, t(10, 0), t(11, 0)))
        .await
        .unwrap();
    let mut events = fx.bus.subscribe();

    let moved = fx
        .engine
        .update_appointment_time(appt.id, monday(), t(15, 0), t(16, 0))
        .await
        .unwrap();

    assert_eq!((moved.start_time, moved.end_time), (t(15, 0), t(16, 0)));
    assert_eq!(moved.created_at, appt.created_at);
    assert_eq!(events.recv().await.unwrap().event_type, "appointment.updated");
}

#[tokio::test]
async fn reschedule_overlapping_own_slot_is_not_a_conflict() {
    let fx = fixture();
    let appt = fx
        .engine
        .book_appointment(request(fx.member.id, t(10, 0), t(11, 0)))
        .await
        .unwrap();

    fx.engine
        .update_appointment_time(appt.id, monday(), t(10, 30), t(11, 30))
        .await
        .unwrap();
}

#[tokio::test]
async fn reschedule_onto_other_appointment_conflicts() {
    let fx = fixture();
    let first = fx
        .engine
        .book_appointment(request(fx.member.id, t(9, 0), t(10, 0)))
        .await
        .unwrap();
    let second = fx
        .engine
        .book_appointment(request(fx.member.id, t(15, 0), t(16, 0)))
        .await
        .unwrap();

    let err = fx
        .engine
        .update_appointment_time(second.id, monday(), t(9, 30), t(10, 30))
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::AppointmentConflict { appointment_id } if appointment_id == first.id);

    // The failed update left the row untouched.
    let unchanged = fx.engine.get_appointment(second.id).await.unwrap();
    assert_eq!(unchanged.start_time, t(15, 0));
}

#[tokio::test]
async fn reschedule_outside_hours_rejected() {
    let fx = fixture();
    let appt = fx
        .engine
        .book_appointment(request(fx.member.id, t(10, 0), t(11, 0)))
        .await
        .unwrap();

    let err = fx
        .engine
        .update_appointment_time(appt.id, monday(), t(16, 30), t(17, 30))
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::OutOfAvailability(_));
}

#[tokio::test]
async fn terminal_appointment_cannot_be_rescheduled() {
    let fx = fixture();
    let appt = fx
        .engine
        .book_appointment(request(fx.member.id, t(10, 0), t(11, 0)))
        .await
        .unwrap();
    fx.engine
        .change_appointment_status(appt.id, AppointmentStatus::NoShow)
        .await
        .unwrap();

    let err = fx
        .engine
        .update_appointment_time(appt.id, monday(), t(15, 0), t(16, 0))
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::InvalidTransition(_));
}

#[tokio::test]
async fn patch_moving_start_keeps_duration() {
    let fx = fixture();
    let appt = fx
        .engine
        .book_appointment(request(fx.member.id, t(10, 0), t(10, 45)))
        .await
        .unwrap();

    let moved = fx
        .engine
        .update_appointment(
            appt.id,
            AppointmentPatch {
                start_time: Some(t(14, 0)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.end_time, t(14, 45));
}

#[tokio::test]
async fn patch_moving_to_another_member_checks_their_day() {
    let fx = fixture();
    let other = fx.store.add_member(ORG_ID, "Beto");
    fx.store
        .add_weekly_rule(&weekly(ScheduleScope::Member, other.id, 1, (14, 18), None))
        .unwrap();

    let appt = fx
        .engine
        .book_appointment(request(fx.member.id, t(10, 0), t(11, 0)))
        .await
        .unwrap();

    // Beto does not work at 10:00.
    let err = fx
        .engine
        .update_appointment(
            appt.id,
            AppointmentPatch {
                member_id: Some(other.id),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::OutOfAvailability(_));

    let moved = fx
        .engine
        .update_appointment(
            appt.id,
            AppointmentPatch {
                member_id: Some(other.id),
                start_time: Some(t(15, 0)),
                end_time: Some(t(16, 0)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.member_id, other.id);
    assert!(fx
        .engine
        .list_appointments(fx.member.id, monday())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn notes_and_status_patch_skips_availability() {
    let fx = fixture();
    let appt = fx
        .engine
        .book_appointment(request(fx.member.id, t(10, 0), t(11, 0)))
        .await
        .unwrap();

    // The day closes after the booking was made.
    fx.store
        .add_special_date(&closed_on(ScheduleScope::Member, fx.member.id, monday()))
        .unwrap();

    let updated = fx
        .engine
        .update_appointment(
            appt.id,
            AppointmentPatch {
                status: Some(AppointmentStatus::Confirmed),
                notes: Some("Confirmado por telefono".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.status, AppointmentStatus::Confirmed);
    assert_eq!(updated.notes.as_deref(), Some("Confirmado por telefono"));
}

// ---------------------------------------------------------------------------
// Status changes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_lifecycle() {
    let fx = fixture();
    let appt = fx
        .engine
        .book_appointment(request(fx.member.id, t(10, 0), t(11, 0)))
        .await
        .unwrap();

    for status in [
        AppointmentStatus::Confirmed,
        AppointmentStatus::InProgress,
        AppointmentStatus::Completed,
    ] {
        let updated = fx
            .engine
            .change_appointment_status(appt.id, status)
            .await
            .unwrap();
        assert_eq!(updated.status, status);
    }

    let err = fx
        .engine
        .change_appointment_status(appt.id, AppointmentStatus::Cancelled)
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::InvalidTransition(_));
}

#[tokio::test]
async fn skipping_and_self_transitions_rejected() {
    let fx = fixture();
    let appt = fx
        .engine
        .book_appointment(request(fx.member.id, t(10, 0), t(11, 0)))
        .await
        .unwrap();

    for status in [AppointmentStatus::Completed, AppointmentStatus::Scheduled] {
        let err = fx
            .engine
            .change_appointment_status(appt.id, status)
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::InvalidTransition(_));
    }
}

#[tokio::test]
async fn cancelling_emits_cancelled_event() {
    let fx = fixture();
    let appt = fx
        .engine
        .book_appointment(request(fx.member.id, t(10, 0), t(11, 0)))
        .await
        .unwrap();
    let mut events = fx.bus.subscribe();

    fx.engine
        .change_appointment_status(appt.id, AppointmentStatus::Cancelled)
        .await
        .unwrap();

    let event = events.recv().await.unwrap();
    assert_eq!(event.event_type, "appointment.cancelled");
    assert_eq!(event.payload["appointment"]["status"], "cancelada");
}

#[tokio::test]
async fn status_change_on_unknown_appointment_not_found() {
    let fx = fixture();
    let err = fx
        .engine
        .change_appointment_status(777, AppointmentStatus::Confirmed)
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::NotFound { entity: "Appointment", id: 777 });
}

// ---------------------------------------------------------------------------
// Deletion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delete_is_unconditional_and_emits_cancelled() {
    let fx = fixture();
    let appt = fx
        .engine
        .book_appointment(request(fx.member.id, t(10, 0), t(11, 0)))
        .await
        .unwrap();
    fx.engine
        .change_appointment_status(appt.id, AppointmentStatus::Confirmed)
        .await
        .unwrap();
    let mut events = fx.bus.subscribe();

    let deleted = fx.engine.delete_appointment(appt.id).await.unwrap();
    assert_eq!(deleted.id, appt.id);
    assert_eq!(events.recv().await.unwrap().event_type, "appointment.cancelled");

    assert_matches!(
        fx.engine.get_appointment(appt.id).await,
        Err(CoreError::NotFound { .. })
    );
    assert_matches!(
        fx.engine.delete_appointment(appt.id).await,
        Err(CoreError::NotFound { .. })
    );
}
