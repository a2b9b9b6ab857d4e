//! Operator endpoints over the shared working set.

use axum::extract::{Path, Query, State};
use axum::response::Html;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::domain::{AffiliateTransaction, StatusChange};
use crate::error::AppError;
use crate::orchestration::{BulkOutcome, WorklistView};

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SelectionRequest {
    pub checked: bool,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: StatusChange,
}

/// A confirmed single-item mutation and the working set after it.
#[derive(Debug, Serialize)]
pub struct MutationResponse {
    pub transaction: AffiliateTransaction,
    pub worklist: WorklistView,
}

#[derive(Debug, Serialize)]
pub struct BulkResponse {
    pub outcome: BulkOutcome,
    pub worklist: WorklistView,
}

/// Load `page` from both upstreams and replace the working set with it.
pub async fn get_transactions(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Json<WorklistView> {
    let page = state.loader.load(query.page.unwrap_or(1)).await;
    let mut wl = state.worklist.lock().await;
    wl.refresh(page);
    Json(wl.view())
}

pub async fn get_worklist(State(state): State<AppState>) -> Json<WorklistView> {
    Json(state.worklist.lock().await.view())
}

pub async fn set_selection(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SelectionRequest>,
) -> Result<Json<WorklistView>, AppError> {
    let mut wl = state.worklist.lock().await;
    wl.set_checked(&id, req.checked)?;
    Ok(Json(wl.view()))
}

// Mutations run on their own task so a dropped client connection cannot
// cancel them halfway and leave the busy flags set.

pub async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<MutationResponse>, AppError> {
    let task_state = state.clone();
    let transaction = tokio::spawn(async move {
        task_state
            .mutator
            .set_status(&task_state.worklist, &id, req.status)
            .await
    })
    .await??;

    let worklist = state.worklist.lock().await.view();
    Ok(Json(MutationResponse {
        transaction,
        worklist,
    }))
}

pub async fn equalize(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MutationResponse>, AppError> {
    let task_state = state.clone();
    let transaction = tokio::spawn(async move {
        task_state
            .mutator
            .equalize_price(&task_state.worklist, &id)
            .await
    })
    .await??;

    let worklist = state.worklist.lock().await.view();
    Ok(Json(MutationResponse {
        transaction,
        worklist,
    }))
}

pub async fn bulk_status(
    State(state): State<AppState>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<BulkResponse>, AppError> {
    let task_state = state.clone();
    let outcome = tokio::spawn(async move {
        task_state
            .mutator
            .bulk_set_status(&task_state.worklist, req.status)
            .await
    })
    .await??;

    let worklist = state.worklist.lock().await.view();
    Ok(Json(BulkResponse { outcome, worklist }))
}

pub async fn index_page() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

const INDEX_PAGE: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Pending transactions</title>
<style>
tr.selected { background: #e6f4e6; }
tr.mismatched { background: #fbe3e3; }
tr.busy { opacity: 0.5; }
</style>
</head>
<body>
<p>
  <button id="prev">&laquo;</button> <span id="pager"></span> <button id="next">&raquo;</button>
  <button id="approve">Approve selected</button>
  <button id="decline">Decline selected</button>
  <button id="logout">Log out</button>
</p>
<p id="message"></p>
<p id="empty" hidden>No pending transactions.</p>
<table id="table">
<thead><tr><th></th><th>Order</th><th>Date</th><th>Amount</th><th>Store price</th><th>Store status</th><th></th></tr></thead>
<tbody id="rows"></tbody>
</table>
<script>
let view = null;
let page = 1;

async function call(method, url, body) {
  const res = await fetch(url, {
    method,
    headers: {"Content-Type": "application/json"},
    body: body === undefined ? undefined : JSON.stringify(body),
  });
  if (res.redirected) { window.location = res.url; return null; }
  const json = await res.json().catch(() => ({}));
  if (!res.ok) { document.getElementById("message").textContent = json.error || res.statusText; return null; }
  document.getElementById("message").textContent = "";
  return json;
}

function money(amount, currency) {
  if (amount === null || amount === undefined) return "";
  return `${Number(amount).toFixed(2)} ${currency || ""}`.trim();
}

function safeUrl(url) {
  return typeof url === "string" && /^https?:\/\//i.test(url) ? url : null;
}

function cell(tr, content) {
  const td = document.createElement("td");
  if (content instanceof Node) td.appendChild(content);
  else td.textContent = content === null || content === undefined ? "" : String(content);
  tr.appendChild(td);
  return td;
}

function actionButton(td, label, disabled, onClick) {
  const btn = document.createElement("button");
  btn.textContent = label;
  btn.disabled = disabled;
  btn.addEventListener("click", onClick);
  td.appendChild(btn);
}

async function mutate(method, url, body) {
  const res = await call(method, url, body);
  if (res) render(res.worklist); else refresh();
}

function render(v) {
  view = v;
  page = v.currentPage;
  const empty = v.totalItems === 0 || v.rows.length === 0;
  document.getElementById("empty").hidden = !empty;
  document.getElementById("table").hidden = empty;
  document.getElementById("pager").textContent = empty
    ? ""
    : `${v.currentPage} / ${v.totalPages} (${v.totalItems})`;
  document.getElementById("prev").disabled = v.currentPage <= 1;
  document.getElementById("next").disabled = v.currentPage >= v.totalPages;

  const tbody = document.getElementById("rows");
  tbody.replaceChildren();
  for (const row of v.rows) {
    const tr = document.createElement("tr");
    tr.className = row.rowClass + (row.busy ? " busy" : "");
    const locked = row.busy || v.bulkBusy;

    const box = document.createElement("input");
    box.type = "checkbox";
    box.checked = row.checked;
    box.disabled = row.busy;
    box.addEventListener("change", async (e) => {
      const next = await call("PUT", `/api/worklist/${encodeURIComponent(row.id)}/selection`, {checked: e.target.checked});
      if (next) render(next);
    });
    cell(tr, box);

    const href = safeUrl(row.adminUrl);
    if (href) {
      const link = document.createElement("a");
      link.href = href;
      link.target = "_blank";
      link.rel = "noopener noreferrer";
      link.textContent = row.orderId;
      cell(tr, link);
    } else {
      cell(tr, row.orderId);
    }
    cell(tr, new Date(row.dateTime).toLocaleString());
    cell(tr, money(row.comparableAmount, row.currency));
    cell(tr, money(row.storePrice, row.storeCurrency));
    cell(tr, row.storeStatus);

    const actions = cell(tr, "");
    const base = `/api/worklist/${encodeURIComponent(row.id)}`;
    actionButton(actions, "Approve", locked, () => mutate("POST", `${base}/status`, {status: "approved"}));
    actionButton(actions, "Decline", locked, () => mutate("POST", `${base}/status`, {status: "declined"}));
    if (row.canEqualize) {
      actionButton(actions, "Equalize", locked, () => mutate("POST", `${base}/equalize`));
    }
    tbody.appendChild(tr);
  }
}

async function load(p) {
  const v = await call("GET", `/api/transactions?page=${p}`);
  if (v) render(v);
}

async function refresh() {
  const v = await call("GET", "/api/worklist");
  if (v) render(v);
}

async function bulk(status) {
  const res = await call("POST", "/api/worklist/bulk-status", {status});
  if (!res) return;
  if (res.outcome.failed.length) {
    document.getElementById("message").textContent =
      res.outcome.failed.map((f) => `${f.id}: ${f.error}`).join("; ");
  }
  render(res.worklist);
}

document.getElementById("prev").onclick = () => load(Math.max(page - 1, 1));
document.getElementById("next").onclick = () => {
  if (view && page < view.totalPages) load(page + 1);
};
document.getElementById("approve").onclick = () => bulk("approved");
document.getElementById("decline").onclick = () => bulk("declined");
document.getElementById("logout").onclick = async () => {
  await fetch("/api/logout", {method: "POST"});
  window.location = "/login";
};
load(1);
</script>
</body>
</html>
"#;
