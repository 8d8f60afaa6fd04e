use dioxus::prelude::*;

use super::chat_widget::ChatWidget;

/// Host page shell. The portfolio content itself is static; the widget
/// floats above it.
#[component]
pub fn App() -> Element {
    rsx! {
        main { class: "portfolio",
            ChatWidget {}
        }
    }
}
