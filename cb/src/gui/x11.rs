use std::collections::BTreeMap;
use std::io::BufRead;
use std::process::Stdio;
use std::time::{Duration, Instant};

use anyhow::Context;
use log::{debug, warn};

use x11rb::connection::Connection;
use x11rb::protocol::xproto::{
    Atom, AtomEnum, ChangeWindowAttributesAux, ConnectionExt, CreateWindowAux, EventMask,
    PropMode, PropertyNotifyEvent, SelectionNotifyEvent, SelectionRequestEvent, Window,
    WindowClass,
};
use x11rb::protocol::{xproto, Event};
use x11rb::rust_connection::RustConnection;
use x11rb::{COPY_FROM_PARENT, CURRENT_TIME};

use crate::content::ClipboardContent;
use crate::gui::GuiBackend;
use crate::mime;

const INCR_CHUNK_BYTES: usize = 64 * 1024;
const PROTOCOL_TIMEOUT: Duration = Duration::from_secs(5);

/// The X11 `CLIPBOARD` selection, spoken natively over x11rb. Reading
/// happens in-process; writing hands the selection to a detached
/// daemon process (`--x11-daemon`) that owns it until another client
/// takes over.
pub struct X11Backend;

impl GuiBackend for X11Backend {
    fn name(&self) -> &'static str {
        "x11"
    }

    fn supports_cut(&self) -> bool {
        true
    }

    fn get(&self, preferred_mime: Option<&str>) -> anyhow::Result<ClipboardContent> {
        match read_selection(preferred_mime) {
            Ok(content) => Ok(content),
            Err(e) => {
                debug!("x11 read failed: {e:#}");
                Ok(ClipboardContent::default())
            }
        }
    }

    fn set(&self, content: &ClipboardContent) -> anyhow::Result<bool> {
        if content.is_empty() {
            return Ok(false);
        }
        spawn_paste_daemon()
    }
}

struct Atoms {
    clipboard: Atom,
    targets: Atom,
    multiple: Atom,
    timestamp: Atom,
    incr: Atom,
    atom_pair: Atom,
    /// Scratch property used for transfers on our own window.
    transfer: Atom,
}

fn intern_atom<C: Connection>(conn: &C, name: &str) -> anyhow::Result<Atom> {
    Ok(conn
        .intern_atom(false, name.as_bytes())
        .context("intern_atom")?
        .reply()
        .context("intern_atom reply")?
        .atom)
}

impl Atoms {
    fn load<C: Connection>(conn: &C) -> anyhow::Result<Self> {
        Ok(Self {
            clipboard: intern_atom(conn, "CLIPBOARD")?,
            targets: intern_atom(conn, "TARGETS")?,
            multiple: intern_atom(conn, "MULTIPLE")?,
            timestamp: intern_atom(conn, "TIMESTAMP")?,
            incr: intern_atom(conn, "INCR")?,
            atom_pair: intern_atom(conn, "ATOM_PAIR")?,
            transfer: intern_atom(conn, "CB_TRANSFER")?,
        })
    }
}

fn create_window(conn: &RustConnection, screen_num: usize) -> anyhow::Result<Window> {
    let screen = &conn.setup().roots[screen_num];
    let win: Window = conn.generate_id().context("gen window id")?;
    let cw = CreateWindowAux::new().event_mask(EventMask::PROPERTY_CHANGE);
    conn.create_window(
        0,
        win,
        screen.root,
        0,
        0,
        1,
        1,
        0,
        WindowClass::INPUT_OUTPUT,
        COPY_FROM_PARENT,
        &cw,
    )
    .context("create window")?;
    Ok(win)
}

/// Poll-with-deadline event wait; x11rb has no timed blocking wait.
fn wait_for_event<F, T>(conn: &RustConnection, mut select: F) -> anyhow::Result<Option<T>>
where
    F: FnMut(&Event) -> Option<T>,
{
    let start = Instant::now();
    loop {
        if let Some(ev) = conn.poll_for_event().context("poll_for_event")? {
            if let Some(out) = select(&ev) {
                return Ok(Some(out));
            }
            continue;
        }
        if start.elapsed() > PROTOCOL_TIMEOUT {
            return Ok(None);
        }
        std::thread::sleep(Duration::from_millis(2));
    }
}

fn atoms_from_bytes(value: &[u8]) -> Vec<Atom> {
    value
        .chunks_exact(4)
        .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Request `target` and collect the reply property, following the INCR
/// protocol when the owner chose it.
fn convert_and_read(
    conn: &RustConnection,
    win: Window,
    atoms: &Atoms,
    target: Atom,
) -> anyhow::Result<Option<Vec<u8>>> {
    conn.convert_selection(win, atoms.clipboard, target, atoms.transfer, CURRENT_TIME)
        .context("convert_selection")?;
    conn.flush().ok();

    let notified = wait_for_event(conn, |ev| match ev {
        Event::SelectionNotify(n) if n.requestor == win && n.selection == atoms.clipboard => {
            Some(n.property)
        }
        _ => None,
    })?;
    let Some(property) = notified else {
        return Ok(None); // owner never answered
    };
    if property == x11rb::NONE {
        return Ok(None); // refused
    }

    // AtomEnum::NONE is AnyPropertyType here.
    let reply = conn
        .get_property(true, win, property, AtomEnum::NONE, 0, u32::MAX)
        .context("get_property")?
        .reply()
        .context("get_property reply")?;
    conn.flush().ok();

    if reply.type_ != atoms.incr {
        return Ok(Some(reply.value));
    }

    // INCR: the first reply only carries a size hint. Deleting the
    // property (done by get_property with delete=true above) asks the
    // owner for the first chunk; every further delete requests the
    // next one. A zero-sized chunk terminates the transfer.
    let size_hint = reply
        .value32()
        .and_then(|mut v| v.next())
        .unwrap_or(0) as usize;
    let mut out: Vec<u8> = Vec::with_capacity(size_hint);

    loop {
        let got = wait_for_event(conn, |ev| match ev {
            Event::PropertyNotify(PropertyNotifyEvent {
                window,
                atom,
                state,
                ..
            }) if *window == win && *atom == property && *state == xproto::Property::NEW_VALUE => {
                Some(())
            }
            _ => None,
        })?;
        if got.is_none() {
            warn!("INCR transfer stalled after {} bytes", out.len());
            return Ok(None);
        }
        let chunk = conn
            .get_property(true, win, property, AtomEnum::NONE, 0, u32::MAX)
            .context("get_property INCR chunk")?
            .reply()
            .context("get_property INCR chunk reply")?;
        conn.flush().ok();
        if chunk.value.is_empty() {
            break;
        }
        out.extend_from_slice(&chunk.value);
    }

    Ok(Some(out))
}

fn read_selection(preferred_mime: Option<&str>) -> anyhow::Result<ClipboardContent> {
    let (conn, screen_num) = RustConnection::connect(None).context("connect X11")?;
    let atoms = Atoms::load(&conn)?;
    let win = create_window(&conn, screen_num)?;

    // First round trip: what does the owner offer?
    let Some(raw_targets) = convert_and_read(&conn, win, &atoms, atoms.targets)? else {
        return Ok(ClipboardContent::default());
    };
    let target_atoms = atoms_from_bytes(&raw_targets);

    let mut offered: Vec<String> = Vec::with_capacity(target_atoms.len());
    for atom in &target_atoms {
        if let Ok(cookie) = conn.get_atom_name(*atom) {
            if let Ok(r) = cookie.reply() {
                offered.push(String::from_utf8_lossy(&r.name).into_owned());
            }
        }
    }

    let Some(best) = mime::find_best(offered.iter().map(String::as_str), preferred_mime) else {
        debug!("no supported MIME among offered targets: {offered:?}");
        return Ok(ClipboardContent::default());
    };

    let chosen = intern_atom(&conn, &best)?;
    let Some(bytes) = convert_and_read(&conn, win, &atoms, chosen)? else {
        return Ok(ClipboardContent::default());
    };

    let mut content = mime::decode_as(&best, &bytes);
    offered.retain(|t| t != "TARGETS" && t != "MULTIPLE" && t != "TIMESTAMP");
    content.available_types = offered;
    Ok(content)
}

/// Re-exec ourselves as a detached selection owner and wait for it to
/// report readiness, bounded by the protocol timeout.
fn spawn_paste_daemon() -> anyhow::Result<bool> {
    let exe = std::env::current_exe().context("current_exe")?;
    let mut child = std::process::Command::new(exe)
        .arg("--x11-daemon")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .context("spawn x11 daemon")?;

    let Some(stdout) = child.stdout.take() else {
        return Ok(false);
    };
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let mut line = String::new();
        let _ = std::io::BufReader::new(stdout).read_line(&mut line);
        let _ = tx.send(line);
    });

    match rx.recv_timeout(PROTOCOL_TIMEOUT) {
        Ok(line) if line.trim() == "READY" => Ok(true),
        _ => {
            warn!("x11 daemon did not become ready in time");
            Ok(false)
        }
    }
}

/// Entry point for the hidden `--x11-daemon` invocation: detach from
/// the session, take the selection, serve requests until we lose it.
pub fn run_daemon(payloads_by_name: Vec<(String, Vec<u8>)>) -> anyhow::Result<()> {
    if payloads_by_name.is_empty() {
        return Ok(());
    }

    #[cfg(unix)]
    unsafe {
        libc::setsid();
        let root = std::ffi::CString::new("/").unwrap();
        libc::chdir(root.as_ptr());
    }

    let (conn, screen_num) = RustConnection::connect(None).context("connect X11")?;
    let atoms = Atoms::load(&conn)?;
    let win = create_window(&conn, screen_num)?;

    // Maximum X11 request length is expressed in 4-byte units; leave
    // headroom and switch to INCR above the threshold.
    let max_req_bytes = (conn.setup().maximum_request_length as usize).saturating_mul(4);
    let max_direct_bytes = max_req_bytes.saturating_sub(1024).max(8 * 1024) / 2;

    let acquisition_time = acquire_server_time(&conn, win, &atoms)?;

    let mut payloads: BTreeMap<Atom, Vec<u8>> = BTreeMap::new();
    for (name, bytes) in payloads_by_name {
        payloads.insert(intern_atom(&conn, &name)?, bytes);
    }

    conn.set_selection_owner(win, atoms.clipboard, acquisition_time)
        .context("set_selection_owner")?;
    conn.flush().ok();
    let owner = conn
        .get_selection_owner(atoms.clipboard)
        .context("get_selection_owner")?
        .reply()
        .context("get_selection_owner reply")?
        .owner;
    if owner != win {
        anyhow::bail!("failed to acquire CLIPBOARD ownership");
    }

    // Tell the parent it can go home.
    println!("READY");
    use std::io::Write;
    let _ = std::io::stdout().flush();

    loop {
        let ev = conn.wait_for_event().context("wait_for_event")?;
        match ev {
            Event::SelectionRequest(req) => {
                if let Err(e) = handle_selection_request(
                    &conn,
                    win,
                    &atoms,
                    acquisition_time,
                    &payloads,
                    req,
                    max_direct_bytes,
                ) {
                    debug!("selection request failed: {e:#}");
                }
            }
            Event::SelectionClear(_) => break, // lost ownership; exit
            _ => {}
        }
    }

    Ok(())
}

/// A server timestamp can only be obtained from an event; a no-op
/// property append on our own window produces one.
fn acquire_server_time(
    conn: &RustConnection,
    win: Window,
    atoms: &Atoms,
) -> anyhow::Result<u32> {
    conn.change_property(
        PropMode::APPEND,
        win,
        atoms.transfer,
        AtomEnum::INTEGER,
        32,
        0,
        &[],
    )
    .context("timestamp property poke")?;
    conn.flush().ok();
    let time = wait_for_event(conn, |ev| match ev {
        Event::PropertyNotify(PropertyNotifyEvent { window, time, .. }) if *window == win => {
            Some(*time)
        }
        _ => None,
    })?;
    Ok(time.unwrap_or(CURRENT_TIME))
}

fn send_selection_notify(
    conn: &RustConnection,
    req: &SelectionRequestEvent,
    property: Atom,
) -> anyhow::Result<()> {
    let ev = SelectionNotifyEvent {
        response_type: xproto::SELECTION_NOTIFY_EVENT,
        sequence: 0,
        time: req.time,
        requestor: req.requestor,
        selection: req.selection,
        target: req.target,
        property,
    };
    conn.send_event(false, req.requestor, EventMask::NO_EVENT, ev)
        .context("send_event SelectionNotify")?;
    conn.flush().ok();
    Ok(())
}

fn targets_reply_bytes(atoms: &Atoms, payloads: &BTreeMap<Atom, Vec<u8>>) -> Vec<u8> {
    let mut list: Vec<Atom> = payloads.keys().copied().collect();
    list.push(atoms.targets);
    list.push(atoms.multiple);
    list.push(atoms.timestamp);
    list.sort_unstable();
    list.dedup();
    list.iter().flat_map(|a| a.to_ne_bytes()).collect()
}

/// Answer one target for one requestor property. Returns false when
/// the target had to be refused.
fn write_target_property(
    conn: &RustConnection,
    win: Window,
    atoms: &Atoms,
    acquisition_time: u32,
    payloads: &BTreeMap<Atom, Vec<u8>>,
    requestor: Window,
    target: Atom,
    property: Atom,
    max_direct_bytes: usize,
    allow_incr: bool,
) -> anyhow::Result<bool> {
    if target == atoms.targets {
        let bytes = targets_reply_bytes(atoms, payloads);
        conn.change_property(
            PropMode::REPLACE,
            requestor,
            property,
            AtomEnum::ATOM,
            32,
            bytes.len() as u32 / 4,
            &bytes,
        )
        .context("change_property TARGETS")?;
        return Ok(true);
    }

    if target == atoms.timestamp {
        conn.change_property(
            PropMode::REPLACE,
            requestor,
            property,
            AtomEnum::INTEGER,
            32,
            1,
            &acquisition_time.to_ne_bytes(),
        )
        .context("change_property TIMESTAMP")?;
        return Ok(true);
    }

    let Some(bytes) = payloads.get(&target) else {
        return Ok(false);
    };

    if bytes.len() <= max_direct_bytes {
        conn.change_property(
            PropMode::REPLACE,
            requestor,
            property,
            target,
            8,
            bytes.len() as u32,
            bytes,
        )
        .context("change_property target")?;
        return Ok(true);
    }

    if !allow_incr {
        // Large payloads inside MULTIPLE are refused; clients retry
        // with a direct request which can use INCR.
        return Ok(false);
    }

    // INCR handshake: announce the total size, notify, then stream a
    // chunk per property deletion, ending with a zero-sized chunk.
    let total: u32 = bytes.len().try_into().unwrap_or(u32::MAX);
    conn.change_property(
        PropMode::REPLACE,
        requestor,
        property,
        atoms.incr,
        32,
        1,
        &total.to_ne_bytes(),
    )
    .context("change_property INCR")?;
    let _ = conn.change_window_attributes(
        requestor,
        &ChangeWindowAttributesAux::new().event_mask(EventMask::PROPERTY_CHANGE),
    );
    conn.flush().ok();

    Ok(incr_send(conn, win, atoms, requestor, property, target, bytes)?)
}

fn incr_send(
    conn: &RustConnection,
    win: Window,
    atoms: &Atoms,
    requestor: Window,
    property: Atom,
    target: Atom,
    bytes: &[u8],
) -> anyhow::Result<bool> {
    let start = Instant::now();
    let mut offset = 0usize;

    loop {
        if start.elapsed() > PROTOCOL_TIMEOUT {
            let _ = conn.set_selection_owner(win, atoms.clipboard, CURRENT_TIME);
            return Ok(false);
        }

        match conn.poll_for_event().context("poll_for_event")? {
            Some(Event::SelectionClear(_)) => return Ok(false),
            Some(Event::PropertyNotify(PropertyNotifyEvent {
                window,
                atom,
                state,
                ..
            })) if window == requestor
                && atom == property
                && state == xproto::Property::DELETE =>
            {
                if offset >= bytes.len() {
                    conn.change_property(
                        PropMode::REPLACE,
                        requestor,
                        property,
                        target,
                        8,
                        0,
                        &[],
                    )
                    .context("INCR terminator")?;
                    conn.flush().ok();
                    return Ok(true);
                }
                let end = (offset + INCR_CHUNK_BYTES).min(bytes.len());
                let chunk = &bytes[offset..end];
                offset = end;
                conn.change_property(
                    PropMode::REPLACE,
                    requestor,
                    property,
                    target,
                    8,
                    chunk.len() as u32,
                    chunk,
                )
                .context("INCR chunk")?;
                conn.flush().ok();
            }
            Some(_) => {}
            None => std::thread::sleep(Duration::from_millis(2)),
        }
    }
}

fn handle_selection_request(
    conn: &RustConnection,
    win: Window,
    atoms: &Atoms,
    acquisition_time: u32,
    payloads: &BTreeMap<Atom, Vec<u8>>,
    req: SelectionRequestEvent,
    max_direct_bytes: usize,
) -> anyhow::Result<()> {
    // ICCCM request validation: our selection, our ownership window,
    // and a request time no older than our acquisition.
    let valid = req.owner == win
        && req.selection == atoms.clipboard
        && (req.time == CURRENT_TIME || req.time >= acquisition_time);
    if !valid {
        return send_selection_notify(conn, &req, x11rb::NONE);
    }

    let mut property = req.property;
    if property == x11rb::NONE {
        // Obsolete clients: fall back to the target atom.
        property = req.target;
    }

    if req.target == atoms.multiple {
        let pairs = read_atom_pairs(conn, atoms, req.requestor, property)?;
        let Some(pairs) = pairs else {
            return send_selection_notify(conn, &req, x11rb::NONE);
        };

        let mut answered: Vec<(Atom, Atom)> = Vec::with_capacity(pairs.len());
        for (target, prop) in pairs {
            if prop == x11rb::NONE {
                answered.push((target, prop));
                continue;
            }
            let ok = write_target_property(
                conn,
                win,
                atoms,
                acquisition_time,
                payloads,
                req.requestor,
                target,
                prop,
                max_direct_bytes,
                false,
            )
            .unwrap_or(false);
            answered.push((target, if ok { prop } else { x11rb::NONE }));
        }

        let mut out: Vec<u8> = Vec::with_capacity(answered.len() * 8);
        for (t, p) in answered {
            out.extend_from_slice(&t.to_ne_bytes());
            out.extend_from_slice(&p.to_ne_bytes());
        }
        conn.change_property(
            PropMode::REPLACE,
            req.requestor,
            property,
            atoms.atom_pair,
            32,
            out.len() as u32 / 4,
            &out,
        )
        .context("change_property MULTIPLE")?;
        return send_selection_notify(conn, &req, property);
    }

    let ok = write_target_property(
        conn,
        win,
        atoms,
        acquisition_time,
        payloads,
        req.requestor,
        req.target,
        property,
        max_direct_bytes,
        true,
    )?;
    send_selection_notify(conn, &req, if ok { property } else { x11rb::NONE })
}

fn read_atom_pairs(
    conn: &RustConnection,
    atoms: &Atoms,
    requestor: Window,
    property: Atom,
) -> anyhow::Result<Option<Vec<(Atom, Atom)>>> {
    let Ok(cookie) = conn.get_property(false, requestor, property, atoms.atom_pair, 0, u32::MAX)
    else {
        return Ok(None);
    };
    let Ok(reply) = cookie.reply() else {
        return Ok(None);
    };
    if reply.format != 32 {
        return Ok(None);
    }
    let flat = atoms_from_bytes(&reply.value);
    if flat.len() % 2 != 0 {
        return Ok(None);
    }
    Ok(Some(
        flat.chunks_exact(2).map(|p| (p[0], p[1])).collect(),
    ))
}

/// Used by `main` when invoked with `--x11-daemon`: rebuild the
/// advertised payloads from the stored default clipboard.
pub fn daemon_main() -> anyhow::Result<()> {
    let paths = crate::paths::global_paths();
    let content = crate::external::stored_content(&paths, true)?;
    let payloads = mime::encode_all(&content);
    run_daemon(payloads)
}
