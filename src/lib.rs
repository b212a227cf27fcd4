pub mod config;
pub mod data;
pub mod dragdrop;
pub mod ranking;
pub mod remote;
pub mod storage;

use config::{PageConfig, TierSpec, FINISHED_SPRITE};
use data::{fetch_catalog, Item, ItemId};
use dragdrop::{target_position, DragMachine, DragOutcome, Gesture, InsertionPoint, ItemRect};
use log::{debug, error, info, warn};
use ranking::RankingSession;
use std::collections::HashMap;
use storage::{LocalTierStore, RawStore};
use wasm_bindgen::prelude::wasm_bindgen;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{window, Element};
use yew::prelude::*;

const MOUNT_ID: &str = "tier-ranker";

#[derive(PartialEq, Clone)]
enum FetchStatus {
    Loading,
    Ready,
    Error(String),
}

/// What the side panel shows for the item under the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PickerView {
    Loading,
    Unavailable,
    Empty,
    Current {
        name: String,
        sprite_url: String,
        position: String,
    },
    Finished {
        position: String,
    },
}

impl PickerView {
    fn accepts_ranks(&self) -> bool {
        matches!(self, PickerView::Current { .. })
    }
}

fn picker_view<S: RawStore>(status: &FetchStatus, session: Option<&RankingSession<S>>) -> PickerView {
    let session = match (status, session) {
        (FetchStatus::Loading, _) | (_, None) => return PickerView::Loading,
        (FetchStatus::Error(_), Some(_)) => return PickerView::Unavailable,
        (FetchStatus::Ready, Some(session)) => session,
    };

    let (shown, total) = session.progress();
    if total == 0 {
        return PickerView::Empty;
    }
    match session.current() {
        Some(item) => PickerView::Current {
            name: item.name.clone(),
            sprite_url: item.sprite_url.clone(),
            position: format!("{}/{}", shown, total),
        },
        None => PickerView::Finished {
            position: format!("{}/{}", total, total),
        },
    }
}

#[derive(Clone)]
struct BoardHandlers {
    on_grab: Callback<(ItemId, DragEvent)>,
    on_hover: Callback<(String, DragEvent)>,
    on_drop: Callback<(String, DragEvent)>,
    on_drag_end: Callback<DragEvent>,
}

#[function_component(App)]
fn app() -> Html {
    let config = use_state(PageConfig::from_window);
    let status = use_state(|| FetchStatus::Loading);
    let session = use_state(|| None::<RankingSession>);
    let drag = use_mut_ref(DragMachine::new);
    let redraw = use_force_update();
    let show_reset_confirm = use_state(|| false);

    {
        let config = (*config).clone();
        let status = status.clone();
        let session = session.clone();

        use_effect_with_deps(
            move |_| {
                spawn_local(async move {
                    let catalog = match fetch_catalog(&config.category).await {
                        Ok(items) => {
                            info!("Loaded {} items for category {}", items.len(), config.category);
                            status.set(FetchStatus::Ready);
                            items
                        }
                        Err(err) => {
                            error!("Failed to load catalog: {}", err);
                            status.set(FetchStatus::Error(err.to_string()));
                            Vec::new()
                        }
                    };

                    // the catalog is in hand before any saved ranking is applied
                    let mut next = RankingSession::new(
                        catalog,
                        &config.tier_ids(),
                        LocalTierStore::browser(&config.category),
                    );
                    if config.authenticated {
                        match remote::pull_tier_list().await {
                            Ok(Some(raw)) => next.rehydrate(&raw),
                            Ok(None) => next.restore(),
                            Err(err) => {
                                warn!("Failed to pull tier list, using local copy: {}", err);
                                next.restore();
                            }
                        }
                    } else {
                        next.restore();
                    }
                    session.set(Some(next));
                });

                || ()
            },
            (),
        );
    }

    let on_rank = {
        let session = session.clone();
        Callback::from(move |tier_id: String| {
            let Some(mut next) = (*session).clone() else {
                return;
            };
            match next.assign_current(&tier_id) {
                Ok(true) => session.set(Some(next)),
                Ok(false) => debug!("Everything is ranked, ignoring {}", tier_id),
                Err(err) => error!("Failed to rank into {}: {}", tier_id, err),
            }
        })
    };

    let request_reset = {
        let show_reset_confirm = show_reset_confirm.clone();
        Callback::from(move |_| show_reset_confirm.set(true))
    };

    let cancel_reset = {
        let show_reset_confirm = show_reset_confirm.clone();
        Callback::from(move |_| show_reset_confirm.set(false))
    };

    let confirm_reset = {
        let session = session.clone();
        let show_reset_confirm = show_reset_confirm.clone();
        let authenticated = config.authenticated;
        Callback::from(move |_| {
            show_reset_confirm.set(false);
            let Some(mut next) = (*session).clone() else {
                return;
            };
            next.reset();
            session.set(Some(next));

            if authenticated {
                spawn_local(async {
                    if let Err(err) = remote::clear_remote().await {
                        warn!("Failed to clear remote tier list: {}", err);
                    }
                });
            }
        })
    };

    let on_sync = {
        let session = session.clone();
        Callback::from(move |_: MouseEvent| {
            let Some(raw) = (*session).as_ref().and_then(|session| session.store().raw()) else {
                debug!("Nothing saved locally, skipping sync");
                return;
            };
            spawn_local(async move {
                if let Err(err) = remote::push_tier_list(&raw).await {
                    warn!("Failed to push tier list: {}", err);
                }
            });
        })
    };

    let on_logout = {
        let category = config.category.clone();
        Callback::from(move |_: MouseEvent| {
            let category = category.clone();
            spawn_local(async move {
                if let Err(err) = remote::logout().await {
                    warn!("Logout request failed: {}", err);
                }
                LocalTierStore::browser(&category).clear();
                if let Some(window) = window() {
                    if let Err(err) = window.location().set_href("/") {
                        warn!("Failed to navigate after logout: {:?}", err);
                    }
                }
            });
        })
    };

    let on_grab = {
        let drag = drag.clone();
        let redraw = redraw.clone();
        Callback::from(move |(item_id, event): (ItemId, DragEvent)| {
            if let Some(transfer) = event.data_transfer() {
                transfer.set_effect_allowed("move");
                let _ = transfer.set_data("text/plain", "");
            }
            let (width, height) = event_element(&event, ".pokemon-wrapper")
                .map(|element| {
                    let rect = element.get_bounding_client_rect();
                    (rect.width(), rect.height())
                })
                .unwrap_or((0.0, 0.0));
            drag.borrow_mut().handle(Gesture::Grab {
                item: item_id,
                width,
                height,
            });
            redraw.force_update();
        })
    };

    let on_hover = {
        let drag = drag.clone();
        let redraw = redraw.clone();
        Callback::from(move |(tier_id, event): (String, DragEvent)| {
            event.prevent_default();
            if drag.borrow().dragging().is_none() {
                return;
            }
            let rects = event_element(&event, ".tier-content")
                .map(|container| placed_rects(&container))
                .unwrap_or_default();
            let outcome = drag.borrow_mut().handle(Gesture::Hover {
                tier: tier_id,
                x: event.client_x() as f64,
                y: event.client_y() as f64,
                rects,
            });
            if outcome == DragOutcome::Hovered {
                redraw.force_update();
            }
        })
    };

    let on_drop = {
        let drag = drag.clone();
        let session = session.clone();
        let redraw = redraw.clone();
        Callback::from(move |(tier_id, event): (String, DragEvent)| {
            event.prevent_default();
            let rects = event_element(&event, ".tier-content")
                .map(|container| placed_rects(&container))
                .unwrap_or_default();
            let outcome = drag.borrow_mut().handle(Gesture::Drop {
                tier: tier_id,
                x: event.client_x() as f64,
                y: event.client_y() as f64,
                rects,
            });
            let DragOutcome::Dropped { item, tier, at } = outcome else {
                return;
            };

            if let Some(mut next) = (*session).clone() {
                let position = next
                    .board()
                    .tier(&tier)
                    .map(|items| target_position(items, item, at))
                    .unwrap_or(0);
                match next.reorder(item, &tier, position) {
                    Ok(()) => session.set(Some(next)),
                    Err(err) => error!("Failed to move item {}: {}", item, err),
                }
            }
            redraw.force_update();
        })
    };

    let on_drag_end = {
        let drag = drag.clone();
        let session = session.clone();
        let redraw = redraw.clone();
        Callback::from(move |_event: DragEvent| {
            let outcome = drag.borrow_mut().handle(Gesture::Cancel);
            if outcome == DragOutcome::Cancelled {
                if let Some(current) = (*session).as_ref() {
                    current.resave();
                }
                redraw.force_update();
            }
        })
    };

    let handlers = BoardHandlers {
        on_grab,
        on_hover,
        on_drop,
        on_drag_end,
    };

    let view = picker_view(&status, (*session).as_ref());
    let drag_snapshot = drag.borrow().clone();

    html! {
        <div class="tierlist-app">
            <aside class="picker">
                { render_picker(&view) }
                { render_rank_buttons(&config.tiers, view.accepts_ranks(), &on_rank) }
                { render_reset(*show_reset_confirm, request_reset, cancel_reset, confirm_reset) }
                {
                    if config.authenticated {
                        html! {
                            <div class="account-actions">
                                <button class="sync-button" onclick={on_sync}>{ "Save to account" }</button>
                                <button class="logout-button" onclick={on_logout}>{ "Log out" }</button>
                            </div>
                        }
                    } else {
                        html! {}
                    }
                }
            </aside>
            <main class="tier-board">
                { render_board(&config.tiers, (*session).as_ref(), &drag_snapshot, &handlers) }
            </main>
        </div>
    }
}

fn render_picker(view: &PickerView) -> Html {
    let (name, sprite, position) = match view {
        PickerView::Loading => ("Loading…".to_owned(), None, String::new()),
        PickerView::Unavailable => (String::new(), None, String::new()),
        PickerView::Empty => ("No Pokémon".to_owned(), None, String::new()),
        PickerView::Current {
            name,
            sprite_url,
            position,
        } => (name.clone(), Some(sprite_url.clone()), position.clone()),
        PickerView::Finished { position } => (
            "You ranked them all!".to_owned(),
            Some(FINISHED_SPRITE.to_owned()),
            position.clone(),
        ),
    };

    html! {
        <div class="current-item">
            <h2 id="current-name">{ name.clone() }</h2>
            {
                match sprite {
                    Some(src) => html! { <img id="current-image" src={src} alt={name.clone()} /> },
                    None => html! {},
                }
            }
            <p id="current-position">{ position }</p>
        </div>
    }
}

fn render_rank_buttons(tiers: &[TierSpec], visible: bool, on_rank: &Callback<String>) -> Html {
    if !visible {
        return html! {};
    }

    html! {
        <div id="buttons" class="rank-buttons">
            { for tiers.iter().map(|tier| {
                let tier_id = tier.id.clone();
                let on_rank = on_rank.clone();
                let onclick = Callback::from(move |_: MouseEvent| on_rank.emit(tier_id.clone()));
                html! {
                    <button key={tier.id.clone()} class="rank_button" onclick={onclick}>{ &tier.label }</button>
                }
            }) }
        </div>
    }
}

fn render_reset(
    show_confirm: bool,
    on_request: Callback<MouseEvent>,
    on_cancel: Callback<MouseEvent>,
    on_confirm: Callback<MouseEvent>,
) -> Html {
    if show_confirm {
        html! {
            <div class="reset-confirm">
                <p>{ "Reset this generation's tier list?" }</p>
                <div class="confirm-actions">
                    <button class="confirm-yes" onclick={on_confirm}>{ "Yes" }</button>
                    <button class="confirm-no" onclick={on_cancel}>{ "No" }</button>
                </div>
            </div>
        }
    } else {
        html! {
            <button id="reset-list" class="reset" onclick={on_request}>{ "Reset" }</button>
        }
    }
}

fn render_board(
    tiers: &[TierSpec],
    session: Option<&RankingSession>,
    drag: &DragMachine,
    handlers: &BoardHandlers,
) -> Html {
    let ranks = session.map(|session| session.global_ranks()).unwrap_or_default();

    html! {
        <>
            { for tiers.iter().map(|tier| {
                let items = session
                    .and_then(|session| session.board().tier(&tier.id))
                    .unwrap_or(&[]);
                render_tier(tier, items, &ranks, drag, handlers)
            }) }
        </>
    }
}

fn render_tier(
    tier: &TierSpec,
    items: &[Item],
    ranks: &HashMap<ItemId, usize>,
    drag: &DragMachine,
    handlers: &BoardHandlers,
) -> Html {
    let placeholder = drag.placeholder().and_then(|placeholder| match &placeholder.target {
        Some((tier_id, at)) if *tier_id == tier.id => Some((placeholder.width, placeholder.height, *at)),
        _ => None,
    });
    let dragging = drag.dragging();

    let mut children: Vec<Html> = Vec::with_capacity(items.len() + 1);
    for item in items {
        if let Some((width, height, InsertionPoint::Before(anchor))) = placeholder {
            if anchor == item.id {
                children.push(render_placeholder(width, height));
            }
        }
        let rank = ranks.get(&item.id).copied().unwrap_or(0);
        children.push(render_item(item, rank, dragging == Some(item.id), handlers));
    }
    if let Some((width, height, InsertionPoint::End)) = placeholder {
        children.push(render_placeholder(width, height));
    }

    let ondragover = {
        let tier_id = tier.id.clone();
        let on_hover = handlers.on_hover.clone();
        Callback::from(move |event: DragEvent| on_hover.emit((tier_id.clone(), event)))
    };
    let ondrop = {
        let tier_id = tier.id.clone();
        let on_drop = handlers.on_drop.clone();
        Callback::from(move |event: DragEvent| on_drop.emit((tier_id.clone(), event)))
    };

    html! {
        <div key={tier.id.clone()} id={tier.id.clone()} class="tier">
            <div class="tier-label">{ &tier.label }</div>
            <div class="tier-content" ondragover={ondragover} ondrop={ondrop}>
                { for children }
            </div>
        </div>
    }
}

fn render_item(item: &Item, rank: usize, is_dragging: bool, handlers: &BoardHandlers) -> Html {
    let item_id = item.id;
    let ondragstart = {
        let on_grab = handlers.on_grab.clone();
        Callback::from(move |event: DragEvent| on_grab.emit((item_id, event)))
    };

    html! {
        <div key={item_id.to_string()}
            class={classes!("pokemon-wrapper", is_dragging.then_some("dragging"))}
            draggable="true"
            data-pokemon-id={item_id.to_string()}
            ondragstart={ondragstart}
            ondragend={handlers.on_drag_end.clone()}>
            <img src={item.sprite_url.clone()} alt={item.name.clone()} width="50" draggable="false" />
            <span class="pokemon-rank-badge">{ rank }</span>
        </div>
    }
}

fn render_placeholder(width: f64, height: f64) -> Html {
    let style = format!(
        "width: {:.0}px; height: {:.0}px; pointer-events: none;",
        width, height
    );
    html! { <div key="drop-placeholder" class="drop-placeholder" style={style}></div> }
}

/// Closest ancestor of the event target matching `selector`.
fn event_element(event: &DragEvent, selector: &str) -> Option<Element> {
    event
        .target()
        .and_then(|target| target.dyn_into::<Element>().ok())
        .and_then(|element| element.closest(selector).ok().flatten())
}

fn placed_rects(container: &Element) -> Vec<ItemRect> {
    let Ok(nodes) = container.query_selector_all(".pokemon-wrapper") else {
        return Vec::new();
    };

    (0..nodes.length())
        .filter_map(|index| nodes.item(index))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .filter_map(|element| {
            let id = element.get_attribute("data-pokemon-id")?.parse::<ItemId>().ok()?;
            let rect = element.get_bounding_client_rect();
            Some(ItemRect {
                id,
                left: rect.left(),
                top: rect.top(),
                width: rect.width(),
                height: rect.height(),
            })
        })
        .collect()
}

#[wasm_bindgen(start)]
pub fn run_app() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());

    let mount = window()
        .and_then(|window| window.document())
        .and_then(|document| document.get_element_by_id(MOUNT_ID));
    match mount {
        Some(root) => {
            yew::Renderer::<App>::with_root(root).render();
        }
        None => {
            yew::Renderer::<App>::new().render();
        }
    }
}
