use std::io::{self, Write};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser};
use log::{info, warn};
use num_bigint::BigUint;
use rand::rngs::StdRng;
use rand::SeedableRng;

use mlpolygen::*;

/// 最大長 LFSR 多項式の生成と判定
#[derive(Parser, Debug)]
#[command(name = "mlpolygen", version, about = "最大長 LFSR 多項式の生成と判定")]
struct Cli {
    /// 生成する多項式の次数（ビット幅）
    order: Option<String>,

    /// POLY が最大長か判定する（複数指定可、ORDER とは排他）
    #[arg(short = 't', long = "test", value_name = "POLY")]
    test: Vec<String>,

    /// 非対称解を対称双対と組にして出力
    #[arg(short = 'p', long)]
    paired: bool,

    /// 各結果にタップ数を付ける
    #[arg(short = 'c', long = "count-taps")]
    count_taps: bool,

    /// タップがちょうど2つの多項式を探す
    #[arg(short = '2', long = "two-taps")]
    two_taps: bool,

    /// 連続 BITS ビットの全組み合わせを総当たり
    #[arg(short = 'f', long = "brute-force", value_name = "BITS")]
    brute_force: Option<usize>,

    /// 総当たり窓の最下位ビット
    #[arg(short = 'u', long = "shift-up", value_name = "SHIFT", default_value_t = 0)]
    shift_up: usize,

    /// タップ数が N を超える結果を出力しない
    #[arg(short = 'm', long = "max-taps", value_name = "N")]
    max_taps: Option<usize>,

    /// 開始候補（次数は最上位ビットから決まる）
    #[arg(short = 's', long, value_name = "POLY")]
    start: Option<String>,

    /// 終了候補（次数は最上位ビットから決まる）
    #[arg(short = 'e', long, value_name = "POLY")]
    end: Option<String>,

    /// 生成する件数
    #[arg(short = 'n', long = "count", value_name = "N")]
    count: Option<String>,

    /// ランダムな最大長多項式を生成
    #[arg(short = 'r', long)]
    random: bool,

    /// --random の乱数シード
    #[arg(long)]
    seed: Option<u64>,

    /// 探索範囲を 2^K 個に分割して並列実行
    #[arg(short = 'j', long = "segments", value_name = "K")]
    segments: Option<u32>,

    /// 次数によらず任意精度整数を使う
    #[arg(short = 'b', long = "bignum")]
    bignum: bool,

    /// ログを詳細にする（-v info, -vv debug, -vvv trace）
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

/// 次数に応じた格納型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    U64,
    U128,
    Big,
}

impl Backend {
    fn select(order: usize, force_big: bool) -> Self {
        if force_big || order > 128 {
            Backend::Big
        } else if order > 64 {
            Backend::U128
        } else {
            Backend::U64
        }
    }
}

/// RUST_LOG が設定されていればそちらを優先する
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::init_from_env(env_logger::Env::default().default_filter_or(level));
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if !cli.test.is_empty() {
        if cli.order.is_some() {
            warn!("-t 指定時は ORDER 引数を無視します");
        }
        let mut all_maximal = true;
        for text in &cli.test {
            let verdict = test_single(text, cli.bignum)?;
            all_maximal &= verdict.is_maximal();
        }
        return Ok(if all_maximal { ExitCode::SUCCESS } else { ExitCode::FAILURE });
    }

    let order = resolve_order(&cli)?;
    let backend = Backend::select(order, cli.bignum);
    info!("次数 {} ({:?})", order, backend);
    match backend {
        Backend::U64 => run::<u64>(&cli, order)?,
        Backend::U128 => run::<u128>(&cli, order)?,
        Backend::Big => run::<BigUint>(&cli, order)?,
    }
    Ok(ExitCode::SUCCESS)
}

/// 値の最上位ビットから次数を求める
fn order_of(text: &str) -> Result<usize> {
    let value: BigUint = parse_uint(text).with_context(|| format!("数値を解析できません: {:?}", text))?;
    if value.bits() == 0 {
        bail!("多項式が 0 です: {:?}", text);
    }
    Ok(value.bits() as usize)
}

/// ORDER 引数と -s/-e から次数を決める。-s/-e が優先。
fn resolve_order(cli: &Cli) -> Result<usize> {
    let start_order = cli.start.as_deref().map(order_of).transpose()?;
    let end_order = cli.end.as_deref().map(order_of).transpose()?;
    if let (Some(s), Some(e)) = (start_order, end_order) {
        if s != e {
            bail!("開始値と終了値の次数が一致しません ({} と {})", s, e);
        }
    }
    let from_bounds = start_order.or(end_order);

    let from_arg = match &cli.order {
        Some(text) => {
            let value: u64 = parse_uint(text).with_context(|| format!("次数を解析できません: {:?}", text))?;
            Some(usize::try_from(value).context("次数が大きすぎます")?)
        }
        None => None,
    };

    match (from_bounds, from_arg) {
        (Some(bound), Some(arg)) => {
            if bound != arg {
                warn!("次数が {} と {} で二重指定されています。開始/終了値の {} を使います", bound, arg, bound);
            }
            Ok(bound)
        }
        (Some(order), None) | (None, Some(order)) => Ok(order),
        (None, None) => bail!("引数が足りません: ORDER, --start, --end のいずれかが必要です"),
    }
}

fn test_single(text: &str, force_big: bool) -> Result<Verdict> {
    let order = order_of(text)?;
    match Backend::select(order, force_big) {
        Backend::U64 => test_with::<u64>(text),
        Backend::U128 => test_with::<u128>(text),
        Backend::Big => test_with::<BigUint>(text),
    }
}

fn test_with<B: BitVector>(text: &str) -> Result<Verdict> {
    let poly = parse_polynomial::<B>(text)?;
    let tester = MaximalityTester::<B>::new(poly.order())?;
    let verdict = tester.test(&poly)?;
    info!("{:#x}: 判定 {} ({:?})", poly, verdict.code(), verdict);
    println!(
        "{:#x} is {}maximal length for order {}",
        poly,
        if verdict.is_maximal() { "" } else { "NOT " },
        poly.order()
    );
    Ok(verdict)
}

fn parse_count(cli: &Cli) -> Result<Option<usize>> {
    match &cli.count {
        Some(text) => {
            let n: u64 = parse_uint(text).with_context(|| format!("件数を解析できません: {:?}", text))?;
            Ok(Some(usize::try_from(n).context("件数が大きすぎます")?))
        }
        None => Ok(None),
    }
}

/// 1行出力: "8e" または "8e\t# 5"
fn write_plain<B: BitVector>(out: &mut impl Write, poly: &Polynomial<B>, count_taps: bool) -> io::Result<()> {
    if count_taps {
        writeln!(out, "{}\t# {}", poly, poly.num_bits_set())
    } else {
        writeln!(out, "{}", poly)
    }
}

/// 番号付き出力: "1: 0x8e" または "1: 0x8e\t# 5: 0,2,3,4,8"
fn write_numbered<B: BitVector>(
    out: &mut impl Write,
    index: usize,
    poly: &Polynomial<B>,
    count_taps: bool,
) -> io::Result<()> {
    if count_taps {
        writeln!(out, "{}: {:#x}\t# {}: {}", index, poly, poly.num_bits_set(), poly.tap_list())
    } else {
        writeln!(out, "{}: {:#x}", index, poly)
    }
}

fn run<B: BitVector>(cli: &Cli, order: usize) -> Result<()> {
    let started = Instant::now();
    let count = parse_count(cli)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if cli.two_taps || cli.brute_force.is_some() {
        let enumerator = CandidateEnumerator::<B>::new(order)?;
        let (found, stats) = if cli.two_taps {
            let mut iter = enumerator.two_tap();
            let found: Vec<_> = iter.by_ref().collect();
            (found, iter.stats().clone())
        } else {
            let bits = cli.brute_force.unwrap_or_default();
            let mut iter = enumerator.windowed(cli.shift_up, bits)?;
            let found: Vec<_> = iter.by_ref().collect();
            (found, iter.stats().clone())
        };
        for (i, poly) in found.iter().enumerate() {
            write_numbered(&mut out, i + 1, poly, cli.count_taps)?;
        }
        report(found.len(), &stats, started);
        return Ok(());
    }

    if cli.random {
        let rng = match cli.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut iter = CandidateEnumerator::<B>::new(order)?.random(count.unwrap_or(1), rng);
        let mut n = 0;
        for poly in iter.by_ref() {
            write_plain(&mut out, &poly, cli.count_taps)?;
            n += 1;
        }
        report(n, iter.stats(), started);
        return Ok(());
    }

    if let Some(k) = cli.segments {
        if cli.start.is_some() || cli.end.is_some() || count.is_some() {
            warn!("--segments は全範囲を探索します（--start/--end/--count は無視）");
        }
        let result = search_segments::<B>(order, k)?;
        let mut n = 0;
        for poly in &result.polynomials {
            if cli.max_taps.is_some_and(|max| poly.num_bits_set() > max) {
                continue;
            }
            write_plain(&mut out, poly, cli.count_taps)?;
            n += 1;
        }
        report(n, &result.stats, started);
        return Ok(());
    }

    let options = SearchOptions {
        start: cli.start.as_deref().map(parse_polynomial::<B>).transpose()?,
        end: cli.end.as_deref().map(parse_polynomial::<B>).transpose()?,
        max_results: count,
        paired: cli.paired,
        max_taps: cli.max_taps,
    };
    if let Some(start) = &options.start {
        info!(
            "次数 {} の最大長多項式を {:#x} から生成{}",
            order,
            start,
            if options.paired { "（ペア）" } else { "" }
        );
    }
    let mut iter = CandidateEnumerator::<B>::new(order)?.sequential(options)?;
    let mut n = 0;
    for poly in iter.by_ref() {
        write_plain(&mut out, &poly, cli.count_taps)?;
        n += 1;
    }
    report(n, iter.stats(), started);
    Ok(())
}

fn report(found: usize, stats: &SearchStats, started: Instant) {
    info!(
        "{} 件: 判定 {}, 短周期 {}, 因数除外 {}, 不整合 {}, タップ数除外 {} ({:.2?})",
        found,
        stats.tested,
        stats.early,
        stats.factor,
        stats.inconsistent,
        stats.filtered,
        started.elapsed()
    );
}
