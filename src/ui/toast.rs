use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::time::Duration;

use leptos::*;

use super::use_app;
use crate::notice::{Notice, NoticeLevel};
use crate::runtime;

const TOAST_LIFETIME: Duration = Duration::from_secs(5);

fn level_class(level: NoticeLevel) -> &'static str {
    match level {
        NoticeLevel::Info => "toast info",
        NoticeLevel::Success => "toast success",
        NoticeLevel::Error => "toast error",
    }
}

/// Renders the notice board; each notice dismisses itself after a few seconds.
#[component]
pub fn Toasts() -> impl IntoView {
    let notices = use_app().notices;
    let (list, set_list) = create_signal(notices.current());
    let scheduled: Rc<RefCell<HashSet<u64>>> = Rc::default();

    let board = notices.clone();
    let sub = notices.subscribe(move |current: &Vec<Notice>| {
        set_list.set(current.clone());
        for notice in current {
            if !scheduled.borrow_mut().insert(notice.id) {
                continue;
            }
            let board = board.clone();
            let id = notice.id;
            runtime::spawn_local(async move {
                runtime::sleep(TOAST_LIFETIME).await;
                board.dismiss(id);
            });
        }
    });
    on_cleanup(move || drop(sub));

    let board = store_value(notices);
    view! {
        <div class="toasts">
            <For
                each=move || list.get()
                key=|notice| notice.id
                children=move |notice| {
                    let id = notice.id;
                    view! {
                        <div class=level_class(notice.level) on:click=move |_| board.with_value(|b| b.dismiss(id))>
                            {notice.text}
                        </div>
                    }
                }
            />
        </div>
    }
}
