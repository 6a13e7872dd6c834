//! Win32 adapters built on `winapi`.
//!
//! The low-level mouse hook runs on its own thread with a message loop, as
//! `WH_MOUSE_LL` requires. Its callback is a global trampoline that only
//! forwards the click point into the channel registered by `install`.

use std::io;
use std::mem;
use std::ptr;
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};
use winapi::ctypes::c_int;
use winapi::shared::minwindef::{DWORD, LPARAM, LRESULT, WORD, WPARAM};
use winapi::shared::windef::{HWND, POINT};
use winapi::um::libloaderapi::GetModuleHandleW;
use winapi::um::processthreadsapi::GetCurrentThreadId;
use winapi::um::winbase::SetThreadExecutionState;
use winapi::um::winnt::{ES_CONTINUOUS, ES_DISPLAY_REQUIRED, ES_SYSTEM_REQUIRED};
use winapi::um::winuser::{
    CallNextHookEx, DispatchMessageW, GetAncestor, GetMessageW, GetWindowTextW,
    GetWindowThreadProcessId, IsWindow, PeekMessageW, PostThreadMessageW, SendInput,
    SetForegroundWindow, SetWindowsHookExW, TranslateMessage, UnhookWindowsHookEx,
    WindowFromPoint, GA_ROOT, INPUT, INPUT_KEYBOARD, KEYEVENTF_KEYUP, MSG, MSLLHOOKSTRUCT,
    PM_NOREMOVE, PM_REMOVE, VK_RETURN, VK_SHIFT, VK_SPACE, WH_MOUSE_LL, WM_LBUTTONDOWN, WM_QUIT, WM_USER,
};

use super::{
    ClickEvent, ClickSink, InputHook, KeyEvent, KeyInjector, Platform, ScreenPoint,
    SleepInhibitor, VirtualKey, WindowSystem,
};
use crate::error::{ResumeError, Result};
use crate::target::WindowHandle;

const TITLE_BUFFER_LEN: usize = 256;

static CLICK_SINK: Mutex<Option<(ClickSink, u64)>> = Mutex::new(None);

pub fn platform() -> Platform {
    Platform {
        windows: Arc::new(Win32Windows),
        hook: Box::new(LowLevelMouseHook::default()),
        keyboard: Box::new(SendInputKeyboard),
        inhibitor: Arc::new(ExecutionStateInhibitor),
    }
}

/// Dispatches every message queued for the calling thread without blocking.
/// Hotkey registration delivers through the registering thread's queue.
pub fn pump_thread_messages() {
    unsafe {
        let mut msg: MSG = mem::zeroed();
        while PeekMessageW(&mut msg, ptr::null_mut(), 0, 0, PM_REMOVE) != 0 {
            TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}

fn to_hwnd(handle: WindowHandle) -> HWND {
    handle.raw() as usize as HWND
}

fn from_hwnd(hwnd: HWND) -> WindowHandle {
    WindowHandle::new(hwnd as usize as u64)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Win32Windows;

impl WindowSystem for Win32Windows {
    fn window_at(&self, point: ScreenPoint) -> Option<WindowHandle> {
        let hwnd = unsafe {
            WindowFromPoint(POINT {
                x: point.x,
                y: point.y,
            })
        };
        if hwnd.is_null() {
            return None;
        }
        // Child controls cannot be foregrounded; report their top-level window.
        let root = unsafe { GetAncestor(hwnd, GA_ROOT) };
        Some(from_hwnd(if root.is_null() { hwnd } else { root }))
    }

    fn owning_process_id(&self, window: WindowHandle) -> Option<u32> {
        let mut pid: DWORD = 0;
        let thread = unsafe { GetWindowThreadProcessId(to_hwnd(window), &mut pid) };
        (thread != 0 && pid != 0).then_some(pid)
    }

    fn window_title(&self, window: WindowHandle) -> String {
        let mut buffer = [0u16; TITLE_BUFFER_LEN];
        let len = unsafe {
            GetWindowTextW(
                to_hwnd(window),
                buffer.as_mut_ptr(),
                TITLE_BUFFER_LEN as c_int,
            )
        };
        let len = usize::try_from(len).unwrap_or(0).min(TITLE_BUFFER_LEN);
        String::from_utf16_lossy(&buffer[..len])
    }

    fn is_window(&self, window: WindowHandle) -> bool {
        unsafe { IsWindow(to_hwnd(window)) != 0 }
    }

    fn bring_to_foreground(&self, window: WindowHandle) -> Result<()> {
        if unsafe { SetForegroundWindow(to_hwnd(window)) } == 0 {
            return Err(ResumeError::window(format!(
                "SetForegroundWindow refused for {window}"
            )));
        }
        Ok(())
    }
}

struct HookWorker {
    thread_id: DWORD,
    handle: JoinHandle<()>,
}

/// `WH_MOUSE_LL` listener forwarding primary-button presses.
#[derive(Default)]
pub struct LowLevelMouseHook {
    worker: Option<HookWorker>,
}

fn set_sink(sink: Option<(ClickSink, u64)>) {
    *CLICK_SINK.lock().unwrap_or_else(PoisonError::into_inner) = sink;
}

fn forward_click(point: ScreenPoint) {
    let guard = CLICK_SINK.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some((sink, session)) = guard.as_ref() {
        let _ = sink.send(ClickEvent {
            point,
            session: *session,
        });
    }
}

unsafe extern "system" fn mouse_hook_proc(code: c_int, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code >= 0 && wparam == WM_LBUTTONDOWN as WPARAM {
        let info = &*(lparam as *const MSLLHOOKSTRUCT);
        forward_click(ScreenPoint::new(info.pt.x, info.pt.y));
    }
    CallNextHookEx(ptr::null_mut(), code, wparam, lparam)
}

fn run_hook_thread(ready: std_mpsc::SyncSender<std::result::Result<DWORD, String>>) {
    unsafe {
        let mut msg: MSG = mem::zeroed();
        // Forces creation of this thread's message queue so WM_QUIT can be posted.
        PeekMessageW(&mut msg, ptr::null_mut(), WM_USER, WM_USER, PM_NOREMOVE);

        let hook = SetWindowsHookExW(
            WH_MOUSE_LL,
            Some(mouse_hook_proc),
            GetModuleHandleW(ptr::null()),
            0,
        );
        if hook.is_null() {
            let _ = ready.send(Err(io::Error::last_os_error().to_string()));
            return;
        }
        let _ = ready.send(Ok(GetCurrentThreadId()));

        while GetMessageW(&mut msg, ptr::null_mut(), 0, 0) > 0 {
            TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }

        UnhookWindowsHookEx(hook);
    }
}

fn post_quit(thread_id: DWORD) -> bool {
    unsafe { PostThreadMessageW(thread_id, WM_QUIT, 0, 0) != 0 }
}

/// Asks the hook thread to quit and joins it. Hands the worker back when the
/// quit message could not be posted, so the caller can try again later.
fn stop_worker(worker: HookWorker, post: impl FnOnce(DWORD) -> bool) -> Option<HookWorker> {
    if !post(worker.thread_id) {
        warn!(
            error = %io::Error::last_os_error(),
            "failed to stop mouse hook thread"
        );
        return Some(worker);
    }
    if worker.handle.join().is_err() {
        warn!("mouse hook thread panicked");
    }
    debug!("mouse hook removed");
    None
}

impl InputHook for LowLevelMouseHook {
    fn install(&mut self, sink: ClickSink, session: u64) -> Result<()> {
        // A worker left over from a failed uninstall gets another stop attempt.
        if let Some(worker) = self.worker.take() {
            self.worker = stop_worker(worker, post_quit);
            if self.worker.is_some() {
                return Err(ResumeError::hook_install(
                    "previous mouse hook could not be stopped",
                ));
            }
        }

        set_sink(Some((sink, session)));
        let (ready_tx, ready_rx) = std_mpsc::sync_channel(1);
        let handle = thread::Builder::new()
            .name("mouse-hook".to_string())
            .spawn(move || run_hook_thread(ready_tx))
            .map_err(|e| {
                set_sink(None);
                ResumeError::hook_install(e.to_string())
            })?;

        match ready_rx.recv() {
            Ok(Ok(thread_id)) => {
                debug!(thread_id, "mouse hook installed");
                self.worker = Some(HookWorker { thread_id, handle });
                Ok(())
            }
            Ok(Err(reason)) => {
                set_sink(None);
                let _ = handle.join();
                Err(ResumeError::hook_install(reason))
            }
            Err(_) => {
                set_sink(None);
                let _ = handle.join();
                Err(ResumeError::hook_install(
                    "hook thread exited before reporting",
                ))
            }
        }
    }

    fn uninstall(&mut self) {
        set_sink(None);
        if let Some(worker) = self.worker.take() {
            self.worker = stop_worker(worker, post_quit);
        }
    }

    fn is_installed(&self) -> bool {
        self.worker.is_some()
    }
}

impl Drop for LowLevelMouseHook {
    fn drop(&mut self) {
        self.uninstall();
    }
}

fn vk_code(key: VirtualKey) -> WORD {
    match key {
        // Virtual-key codes for letters and digits equal their ASCII values.
        VirtualKey::Letter(c) | VirtualKey::Digit(c) => c as WORD,
        VirtualKey::Space => VK_SPACE as WORD,
        VirtualKey::Enter => VK_RETURN as WORD,
        VirtualKey::Shift => VK_SHIFT as WORD,
    }
}

/// Keyboard injection through `SendInput`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SendInputKeyboard;

impl KeyInjector for SendInputKeyboard {
    fn send(&mut self, event: KeyEvent) -> Result<()> {
        let (key, flags) = match event {
            KeyEvent::Down(key) => (key, 0),
            KeyEvent::Up(key) => (key, KEYEVENTF_KEYUP),
        };

        let sent = unsafe {
            let mut input: INPUT = mem::zeroed();
            input.type_ = INPUT_KEYBOARD;
            let ki = input.u.ki_mut();
            ki.wVk = vk_code(key);
            ki.dwFlags = flags;
            SendInput(1, &mut input, mem::size_of::<INPUT>() as c_int)
        };

        if sent != 1 {
            return Err(ResumeError::key_send_failed(
                format!("{key:?}"),
                io::Error::last_os_error().to_string(),
            ));
        }
        Ok(())
    }
}

/// `SetThreadExecutionState` keeps the system and display awake for as long
/// as the calling thread holds the request, so both calls must come from the
/// owner thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExecutionStateInhibitor;

impl SleepInhibitor for ExecutionStateInhibitor {
    fn inhibit(&self) -> Result<()> {
        let previous = unsafe {
            SetThreadExecutionState(ES_CONTINUOUS | ES_SYSTEM_REQUIRED | ES_DISPLAY_REQUIRED)
        };
        if previous == 0 {
            return Err(ResumeError::window(
                "SetThreadExecutionState rejected the sleep inhibition request",
            ));
        }
        Ok(())
    }

    fn release(&self) {
        unsafe {
            SetThreadExecutionState(ES_CONTINUOUS);
        }
    }
}
