use std::cell::{Cell, RefCell};
use std::rc::Rc;

use dioxus::prelude::*;

use portfolio_common::conversation::{self, Conversation, ConversationCell};
use portfolio_common::expiry::ExpiryTimer;
use portfolio_common::markdown::render_bot_markdown;
use portfolio_common::message::Message;
use portfolio_common::now_ms;
use portfolio_common::session;

use super::local_store::LocalStore;
use super::relay_client::HttpRelay;

#[cfg(target_family = "wasm")]
type ExpiryHandle = gloo_timers::callback::Timeout;
#[cfg(not(target_family = "wasm"))]
type ExpiryHandle = ();

type SharedTimer = Rc<RefCell<ExpiryTimer<ExpiryHandle>>>;

/// Lets the send cycle and expiry action mutate the widget's signal.
#[derive(Clone, Copy)]
struct WidgetCell(Signal<Conversation>);

impl ConversationCell for WidgetCell {
    fn update<T>(&mut self, f: impl FnOnce(&mut Conversation) -> T) -> T {
        f(&mut self.0.write())
    }
}

/// Arm the single cache-expiry timer, cancelling any previous one.
fn schedule_expiry(timer: &SharedTimer, chat: Signal<Conversation>, expires_at: i64) {
    #[cfg(target_family = "wasm")]
    {
        let delay = portfolio_common::expiry::delay_ms(expires_at, now_ms());
        let handle = gloo_timers::callback::Timeout::new(delay, move || {
            tracing::debug!("Chat session expired, clearing transcript");
            conversation::expire(&LocalStore, &mut WidgetCell(chat));
        });
        timer.borrow_mut().replace(expires_at, handle);
    }
    #[cfg(not(target_family = "wasm"))]
    {
        let _ = chat;
        timer.borrow_mut().replace(expires_at, ());
    }
}

fn set_body_open_class(open: bool) {
    #[cfg(target_family = "wasm")]
    if let Some(body) = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.body())
    {
        let _ = body.class_list().toggle_with_force("chatbot-open", open);
    }
    #[cfg(not(target_family = "wasm"))]
    let _ = open;
}

fn scroll_transcript_to_end() {
    #[cfg(target_family = "wasm")]
    if let Some(end) = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.get_element_by_id("chat-transcript-end"))
    {
        end.scroll_into_view_with_bool(false);
    }
}

/// Floating portfolio assistant: avatar button plus chat dialog.
#[component]
pub fn ChatWidget() -> Element {
    let restored = use_hook(|| session::restore(&LocalStore, now_ms()));
    let mut chat = use_signal(|| {
        restored
            .as_ref()
            .map(|entry| Conversation::restored(entry.messages.clone()))
            .unwrap_or_default()
    });
    let mut open = use_signal(|| false);
    let mut draft = use_signal(String::new);

    let timer: SharedTimer = use_hook(|| {
        let timer = Rc::new(RefCell::new(ExpiryTimer::new()));
        if let Some(entry) = &restored {
            schedule_expiry(&timer, chat, entry.expires_at);
        }
        timer
    });

    // Persist and re-arm expiry whenever the transcript changes.
    let last_revision = use_hook(|| Rc::new(Cell::new(chat.peek().revision())));
    let fx_timer = timer.clone();
    use_effect(move || {
        let current = chat.read();
        let seen = last_revision.replace(current.revision());
        if !current.persist_due(seen) {
            return;
        }
        let persisted = session::persist(&LocalStore, current.messages(), now_ms());
        drop(current);
        match persisted {
            Ok(expires_at) => schedule_expiry(&fx_timer, chat, expires_at),
            Err(e) => tracing::warn!("Failed to encode chat transcript: {e}"),
        }
    });

    use_effect(move || {
        let _ = chat.read().messages().len();
        if open() {
            scroll_transcript_to_end();
        }
    });

    use_effect(move || set_body_open_class(open()));
    use_drop(|| set_body_open_class(false));

    let mut submit = move || {
        let input = draft.peek().clone();
        if !chat.peek().accepts(&input) {
            return;
        }
        draft.set(String::new());
        spawn(async move {
            let relay = HttpRelay::from_env();
            conversation::send(&mut WidgetCell(chat), &relay, &input, now_ms).await;
        });
    };

    let busy = chat.read().is_busy();
    let messages: Vec<Message> = chat.read().messages().to_vec();
    let send_disabled = busy || draft.read().trim().is_empty();

    rsx! {
        div { class: "chat-widget",
            button {
                class: "chat-avatar-btn",
                aria_label: "Open portfolio assistant",
                onclick: move |_| open.set(!open()),
                span { class: "chat-avatar", "🤖" }
            }

            if open() {
                div { class: "chat-dialog", role: "dialog",
                    div { class: "chat-dialog-header",
                        h3 { "Portfolio Assistant" }
                        p { class: "chat-dialog-description", "Hi! I’m Jake’s portfolio assistant." }
                        button {
                            class: "chat-close-btn",
                            aria_label: "Close",
                            onclick: move |_| open.set(false),
                            "X"
                        }
                    }

                    div { class: "chat-transcript",
                        for message in messages.iter() {
                            MessageBubble { key: "{message.id}", message: message.clone() }
                        }
                        if busy {
                            div { class: "chat-row chat-row-bot",
                                div { class: "chat-bubble chat-bubble-bot", "Typing..." }
                            }
                        }
                        div { id: "chat-transcript-end" }
                    }

                    div { class: "chat-input-row",
                        input {
                            class: "chat-input",
                            placeholder: "Type a message…",
                            value: "{draft}",
                            oninput: move |e| draft.set(e.value()),
                            onkeydown: move |e: KeyboardEvent| {
                                if e.key() == Key::Enter {
                                    submit();
                                }
                            },
                        }
                        button {
                            class: "chat-send-btn",
                            r#type: "button",
                            disabled: send_disabled,
                            onclick: move |_| submit(),
                            "Send"
                        }
                    }
                }
            }
        }
    }
}

/// One transcript turn. Bot text is markdown; user text is shown verbatim.
#[component]
fn MessageBubble(message: Message) -> Element {
    if message.is_user() {
        return rsx! {
            div { class: "chat-row chat-row-user",
                div { class: "chat-bubble chat-bubble-user", "{message.text}" }
            }
        };
    }

    let html = render_bot_markdown(&message.text);
    rsx! {
        div { class: "chat-row chat-row-bot",
            div {
                class: "chat-bubble chat-bubble-bot",
                dangerous_inner_html: "{html}"
            }
        }
    }
}
