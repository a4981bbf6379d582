//! Canned intro-card messages and dialogs.

use crate::conversation::Turn;
use crate::payload::{
    ActionSpec, ActionStyle, Confirmation, DataSource, DialogBuilder, DialogSpec, FieldSpec,
    MessageBuilder, PayloadError, ReplyPayload, SelectOption,
};

pub const CARD_COLOR: &str = "#FF1493";
pub const DEMO_CALLBACK_ID: &str = "123";
pub const DIALOG_CALLBACK_ID: &str = "dialog";
pub const INTRO_CARD_CALLBACK_ID: &str = "introcard";
pub const INTRO_CARD_CONFIRM_CALLBACK_ID: &str = "introcard-rusure";
pub const INTRO_CARDS_COMMAND: &str = "/introcards";

const BUTTON_FALLBACK: &str = "Upgrade Slack to access buttons. Keep up with the times fam.";

pub fn demo_menu() -> ReplyPayload {
    MessageBuilder::new()
        .attachment(|attachment| {
            attachment
                .title("Do you want to interact with my buttons?")
                .callback_id(DEMO_CALLBACK_ID)
                .action(ActionSpec::button("yes", "Yes").style(ActionStyle::Primary))
                .action(ActionSpec::button("no", "No").style(ActionStyle::Danger))
                .action(ActionSpec::select(
                    "form",
                    "Form",
                    vec![
                        SelectOption::new("One", "001"),
                        SelectOption::new("Two", "002"),
                        SelectOption::new("Three", "003"),
                    ],
                ));
        })
        .build()
}

pub fn demo_followup(callback_id: &str) -> ReplyPayload {
    MessageBuilder::new()
        .text(format!(
            "This is the recieved message callback response w/ callback_id: {callback_id}."
        ))
        .attachment(|attachment| {
            attachment
                .title("Some other things to do")
                .callback_id(DEMO_CALLBACK_ID)
                .action(ActionSpec::button("yes", "YAS!"))
                .action(
                    ActionSpec::button("no", "NAW!")
                        .value("delete")
                        .style(ActionStyle::Danger)
                        .confirm(Confirmation {
                            title: "Are you sure?".to_owned(),
                            text: "This will do something!".to_owned(),
                            ok_label: "Yes".to_owned(),
                            dismiss_label: "No".to_owned(),
                        }),
                );
        })
        .build()
}

pub fn demo_declined() -> ReplyPayload {
    MessageBuilder::new()
        .attachment(|attachment| {
            attachment
                .title("You said no... :(")
                .fallback("Upgrade your Slack client to use messages like these. Don't fall out.")
                .callback_id("000");
        })
        .build()
}

/// Name, Email, Number, Person of Interest, Elevator Pitch.
pub fn intro_card_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::text("Name", "name"),
        FieldSpec::email("Email", "email").placeholder("xxx@berkeley.edu"),
        FieldSpec::number("Number", "num")
            .placeholder("###-###-####")
            .length(Some(10), Some(12))
            .optional(),
        FieldSpec::select("Person of Interest", "person", DataSource::Users).optional(),
        FieldSpec::textarea("Elevator Pitch", "pitch")
            .placeholder("Who are you?")
            .length(None, Some(800))
            .hint("e.g. What is fun to you? What makes you happy? What do you like to talk about?"),
    ]
}

pub fn getting_to_know_you_dialog(user_name: &str) -> Result<DialogSpec, PayloadError> {
    DialogBuilder::new("Getting to Know You", format!("dialogue{user_name}"), "Submit")
        .with_fields(intro_card_fields())
        .build()
}

pub fn intro_card_dialog() -> Result<DialogSpec, PayloadError> {
    DialogBuilder::new("Your Intro Card", DIALOG_CALLBACK_ID, "Submit")
        .with_fields(intro_card_fields())
        .build()
}

pub fn dialog_notice() -> ReplyPayload {
    ReplyPayload::text("Your card should appear in the form of a pop up window.")
}

pub fn card_entry() -> ReplyPayload {
    MessageBuilder::new()
        .attachment(|attachment| {
            attachment
                .title(":smirk: Why hello. Pick a card, any card!")
                .callback_id(INTRO_CARD_CALLBACK_ID)
                .color(CARD_COLOR)
                .fallback(BUTTON_FALLBACK)
                .action(ActionSpec::button("yes", "Entertain AWEbot").style(ActionStyle::Primary))
                .action(ActionSpec::button("no", "Reject"));
        })
        .build()
}

pub fn card_second_chance() -> ReplyPayload {
    MessageBuilder::new()
        .attachment(|attachment| {
            attachment
                .title("Are you sure?")
                .callback_id(DIALOG_CALLBACK_ID)
                .color(CARD_COLOR)
                .fallback(BUTTON_FALLBACK);
        })
        .attachment(|attachment| {
            attachment
                .text("Consider me played. Here's your card.")
                .callback_id(DIALOG_CALLBACK_ID)
                .color(CARD_COLOR)
                .fallback(BUTTON_FALLBACK)
                .action(
                    ActionSpec::button("yes", "Take Card from AWEbot").style(ActionStyle::Primary),
                );
        })
        .build()
}

pub fn card_accepted() -> ReplyPayload {
    MessageBuilder::new()
        .attachment(|attachment| {
            attachment
                .title(":smirk: Welcome! Pick a card, any card!")
                .callback_id(INTRO_CARD_CALLBACK_ID)
                .color(CARD_COLOR)
                .fallback(BUTTON_FALLBACK);
        })
        .attachment(|attachment| {
            attachment.pretext(":heavy_check_mark: _You got a blank card_");
        })
        .build()
}

/// Follow-up after a card is taken: an empty opener, then two delayed nudges.
pub fn card_conversation(delay_ms: u64) -> Vec<Turn> {
    let impressed = MessageBuilder::new()
        .attachment(|attachment| {
            attachment.title(":flushed: eyy niiice").color(CARD_COLOR);
        })
        .build();
    let nudge = MessageBuilder::new()
        .attachment(|attachment| {
            attachment
                .text("Wellp, might as well fill it out am I right:")
                .callback_id(DIALOG_CALLBACK_ID)
                .color(CARD_COLOR)
                .action(
                    ActionSpec::button("dialog", "Write in Intro Card")
                        .style(ActionStyle::Primary),
                );
        })
        .build();

    vec![
        Turn::immediate(ReplyPayload::empty()),
        Turn::after(delay_ms, impressed),
        Turn::after(delay_ms, nudge),
    ]
}

pub fn card_rejected() -> ReplyPayload {
    ReplyPayload::text("...Damn you savage.")
}

pub fn card_reject_confirmation() -> ReplyPayload {
    MessageBuilder::new()
        .attachment(|attachment| {
            attachment
                .title("For real?")
                .callback_id(INTRO_CARD_CONFIRM_CALLBACK_ID)
                .action(
                    ActionSpec::button("no2", "Yes, I'm savage like that")
                        .style(ActionStyle::Danger),
                )
                .action(
                    ActionSpec::button("yes2", "Jk, I'll fill out the card")
                        .style(ActionStyle::Primary),
                );
        })
        .build()
}

pub fn name_rejected(text: &str, community_name: &str) -> ReplyPayload {
    ReplyPayload::text(format!(
        "*{text}?* Um hello I'm a member of {community_name} too. I know an invalid string when I see one. "
    ))
}

pub fn name_search(text: &str) -> ReplyPayload {
    ReplyPayload::text(format!("*{text}*. Got it. Wait a moment as I search for their card."))
}

pub fn submission_success(community_name: &str) -> ReplyPayload {
    ReplyPayload::text(format!(
        "*Submission Successful.* On behalf of the {community_name}fficers, welcome to {community_name}!"
    ))
}
